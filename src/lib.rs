//! Share one host channel pair between many logical "funnel" modules.
//!
//! A host environment usually exposes a single outbound/inbound channel pair
//! to foreign code. This crate lets independent protocol modules multiplex
//! over that pair: every message travels in an [`Envelope`] tagged with its
//! module's name, a [`FunnelTable`] dispatches inbound envelopes to the
//! right module's decoder and processor, threads each module's slice of
//! application state through the cycle via a [`StateAccessor`] lens, and a
//! [`SimulatedChannel`] can stand in for the real host so the same
//! application logic runs with no backend present.

pub mod accessor;
pub mod channel;
pub mod envelope;
pub mod error;
pub mod funnel;
pub mod modules;
pub mod table;

pub use accessor::StateAccessor;
pub use channel::{Channel, HostChannel, Inbox, SimulatedChannel};
pub use envelope::Envelope;
pub use error::{EnvelopeError, FunnelError, MessageError};
pub use funnel::{FunnelModule, Response};
pub use table::{Effect, FunnelTable, Handler};
