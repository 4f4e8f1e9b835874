use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use crate::envelope::Envelope;
use crate::funnel::FunnelModule;

/// One module's outbound channel: either the real host port or a simulator.
/// Writes are fire-and-forget; no delivery guarantee is surfaced to the
/// caller, matching the semantics of a real host port.
pub trait Channel {
    fn send(&self, wire: Value);
}

/// Queue of wire values waiting to be dispatched. The application's event
/// loop owns one and pops it between dispatch cycles; simulated responses
/// land here so they are seen as separate inbound events, never inside the
/// dispatch that caused them. Single-threaded by design, hence `Rc`.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    queue: Rc<RefCell<VecDeque<Value>>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, wire: Value) {
        self.queue.borrow_mut().push_back(wire);
    }

    pub fn pop(&self) -> Option<Value> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// The real outbound channel: wraps whatever sink the host environment
/// exposes for writing encoded envelopes.
pub struct HostChannel {
    out: Box<dyn Fn(Value)>,
}

impl HostChannel {
    pub fn new(out: impl Fn(Value) + 'static) -> Self {
        Self { out: Box::new(out) }
    }
}

impl Channel for HostChannel {
    fn send(&self, wire: Value) {
        (self.out)(wire);
    }
}

impl fmt::Debug for HostChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostChannel")
    }
}

/// Pure in-process stand-in for a module's host backend. On send it decodes
/// the outgoing envelope, runs `simulate`, and pushes any response envelope
/// onto the inbox so the application sees it arrive like a real inbound
/// event on a later turn.
///
/// A development-only convenience, so it is deliberately permissive: every
/// failure path degrades to "no effect", it never panics.
pub struct SimulatedChannel<F: FunnelModule> {
    module: F,
    simulate: fn(F::Message) -> Option<F::Message>,
    inbox: Inbox,
}

impl<F: FunnelModule> SimulatedChannel<F> {
    pub fn new(module: F, simulate: fn(F::Message) -> Option<F::Message>, inbox: Inbox) -> Self {
        Self {
            module,
            simulate,
            inbox,
        }
    }
}

impl<F: FunnelModule> Channel for SimulatedChannel<F> {
    fn send(&self, wire: Value) {
        let envelope = match Envelope::from_wire(&wire) {
            Ok(envelope) => envelope,
            Err(err) => {
                trace!(module = self.module.name(), %err, "simulator dropped undecodable envelope");
                return;
            }
        };
        let msg = match self.module.decode(&envelope) {
            Ok(msg) => msg,
            Err(err) => {
                trace!(module = self.module.name(), %err, "simulator dropped unrecognized message");
                return;
            }
        };
        if let Some(reply) = (self.simulate)(msg) {
            self.inbox.push(self.module.encode(&reply).to_wire());
        }
    }
}

impl<F: FunnelModule> fmt::Debug for SimulatedChannel<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedChannel")
            .field("module", &self.module.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::echo::{Echo, EchoMessage, simulate};
    use serde_json::json;

    #[test]
    fn host_channel_writes_to_sink() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let channel = HostChannel::new(move |wire| sink.borrow_mut().push(wire));
        channel.send(json!({"module": "Echo", "tag": "request", "args": "hi"}));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn simulator_defers_response_to_inbox() {
        let inbox = Inbox::new();
        let channel = SimulatedChannel::new(Echo, simulate, inbox.clone());
        channel.send(Echo.encode(&EchoMessage::Request("hi".into())).to_wire());

        let wire = inbox.pop().expect("simulated response queued");
        let envelope = Envelope::from_wire(&wire).unwrap();
        assert_eq!(
            Echo.decode(&envelope).unwrap(),
            EchoMessage::Request("hi".into())
        );
        assert!(inbox.is_empty());
    }

    #[test]
    fn simulator_drops_undecodable_wire() {
        let inbox = Inbox::new();
        let channel = SimulatedChannel::new(Echo, simulate, inbox.clone());
        channel.send(json!("not an envelope"));
        channel.send(json!({"module": "Echo", "tag": "nope", "args": null}));
        assert!(inbox.is_empty());
    }

    #[test]
    fn simulate_none_produces_nothing() {
        let inbox = Inbox::new();
        let channel = SimulatedChannel::new(Echo, simulate, inbox.clone());
        channel.send(Echo.encode(&EchoMessage::Startup).to_wire());
        assert!(inbox.is_empty());
    }
}
