use crate::envelope::Envelope;
use crate::error::MessageError;

/// The one trait funnel module authors implement. A module owns its typed
/// message vocabulary, its slice of state, and the codec between the two and
/// the wire envelope. The router only ever calls through this trait, so a
/// module's internals are not reachable once it sits in a table.
///
/// `name()` must exactly match the identifier used by the module's host-side
/// counterpart (case-sensitive).
///
/// `process` must be pure: identical inputs give identical outputs, and it
/// performs no I/O. Anything the module wants sent back to the host is
/// expressed as [`Response::Command`] and carried out by the commander.
pub trait FunnelModule {
    type Message;
    type State;

    fn name(&self) -> &str;

    /// Wrap a typed message in the wire envelope. Total.
    fn encode(&self, msg: &Self::Message) -> Envelope;

    /// Interpret an envelope addressed to this module. The envelope's
    /// `module` field has already been matched; only `tag` and `args` are
    /// the module's to judge.
    fn decode(&self, envelope: &Envelope) -> Result<Self::Message, MessageError>;

    /// Run one inbound message against the module's sub-state.
    fn process(&self, msg: Self::Message, state: Self::State) -> (Self::State, Response<Self::Message>);
}

/// What a module's `process` hands back. `Batch` nests recursively and is
/// always fully drained: every `Command` inside it is dispatched and every
/// `Message` surfaces to the application handler, no variant is dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Response<M> {
    /// Nothing to say (e.g. a startup acknowledgment). Handlers still run.
    None,
    /// Application-facing message, surfaced to the handler only.
    Message(M),
    /// Self-directed command: re-encoded and sent back out the module's own
    /// channel, the mechanism behind multi-step protocols.
    Command(M),
    /// Any combination of the above.
    Batch(Vec<Response<M>>),
}

impl<M> Response<M> {
    /// Visit every application-facing message in order, batches flattened.
    pub fn messages(&self) -> Vec<&M> {
        let mut out = Vec::new();
        self.walk(&mut |r| {
            if let Response::Message(m) = r {
                out.push(m);
            }
        });
        out
    }

    /// Visit every self-directed command in order, batches flattened.
    pub fn commands(&self) -> Vec<&M> {
        let mut out = Vec::new();
        self.walk(&mut |r| {
            if let Response::Command(m) = r {
                out.push(m);
            }
        });
        out
    }

    fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Response<M>)) {
        match self {
            Response::Batch(items) => {
                for item in items {
                    item.walk(f);
                }
            }
            leaf => f(leaf),
        }
    }
}
