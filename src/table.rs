use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::accessor::StateAccessor;
use crate::channel::Channel;
use crate::envelope::Envelope;
use crate::error::FunnelError;
use crate::funnel::{FunnelModule, Response};

/// Declarative effect description returned by a dispatch cycle. The router
/// never performs I/O itself; the surrounding event loop executes these
/// ([`FunnelTable::perform`] is the provided executor).
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<E> {
    /// An encoded envelope to write to the named module's channel.
    Send { module: String, wire: Value },
    /// Application-defined effect surfaced by a handler.
    App(E),
}

/// Handler supplied by the application per module: sees the module's typed
/// response plus the already-updated application state, updates the
/// application model, and describes any application-level effects.
pub type Handler<M, S, Mo, E> = Box<dyn Fn(&Response<M>, &S, &mut Mo) -> Vec<E>>;

/// Registry mapping module name to everything needed to fully process one
/// envelope: the module itself, the lens into application state, the
/// module's channel (real or simulated), and the application handler.
/// Built once at startup, read-only afterwards.
///
/// `S` is the shared application state, `Mo` the application model, `E` the
/// application's effect vocabulary.
pub struct FunnelTable<S, Mo, E> {
    entries: HashMap<String, Box<dyn ErasedEntry<S, Mo, E>>>,
}

impl<S, Mo, E> FunnelTable<S, Mo, E> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register one module. Fails on a duplicate name rather than silently
    /// replacing a live entry.
    pub fn register<F>(
        &mut self,
        module: F,
        accessor: StateAccessor<S, F::State>,
        channel: Box<dyn Channel>,
        handler: impl Fn(&Response<F::Message>, &S, &mut Mo) -> Vec<E> + 'static,
    ) -> Result<(), FunnelError>
    where
        F: FunnelModule + 'static,
        F::Message: 'static,
        F::State: 'static,
        S: 'static,
        Mo: 'static,
        E: 'static,
    {
        let name = module.name().to_string();
        if self.entries.contains_key(&name) {
            return Err(FunnelError::DuplicateModule(name));
        }
        self.entries.insert(
            name,
            Box::new(Entry {
                module,
                accessor,
                channel,
                handler: Box::new(handler),
            }),
        );
        Ok(())
    }

    pub fn contains(&self, module: &str) -> bool {
        self.entries.contains_key(module)
    }

    /// Names of every registered module, in no particular order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Run one inbound wire value through the full dispatch cycle:
    /// envelope decode, module lookup, message decode, process against the
    /// module's sub-state, write-back, commander walk, handler.
    ///
    /// Commander effects come before handler effects in the returned list.
    /// On any error neither `state` nor `model` has been touched.
    pub fn dispatch(
        &self,
        wire: &Value,
        state: &mut S,
        model: &mut Mo,
    ) -> Result<Vec<Effect<E>>, FunnelError> {
        let envelope = Envelope::from_wire(wire)?;
        debug!(module = %envelope.module, tag = %envelope.tag, "dispatching envelope");
        let entry = self.entries.get(&envelope.module).ok_or_else(|| {
            warn!(module = %envelope.module, "envelope for unregistered module");
            FunnelError::UnknownModule(envelope.module.clone())
        })?;
        entry.dispatch(&envelope, state, model)
    }

    /// Encode a typed message and write it out the module's registered
    /// channel. This is how the application initiates a request.
    pub fn send<F>(&self, module: &F, msg: &F::Message) -> Result<(), FunnelError>
    where
        F: FunnelModule,
    {
        self.send_wire(module.name(), module.encode(msg).to_wire())
    }

    /// Raw variant of [`send`](Self::send), used when executing
    /// [`Effect::Send`] descriptions.
    pub fn send_wire(&self, module: &str, wire: Value) -> Result<(), FunnelError> {
        let entry = self
            .entries
            .get(module)
            .ok_or_else(|| FunnelError::UnknownModule(module.to_string()))?;
        entry.channel().send(wire);
        Ok(())
    }

    /// Execute a dispatch cycle's effects: `Send` effects go out the named
    /// module's channel, application effects are handed back for the caller
    /// to interpret.
    pub fn perform(&self, effects: Vec<Effect<E>>) -> Vec<E> {
        let mut app = Vec::new();
        for effect in effects {
            match effect {
                Effect::Send { module, wire } => {
                    if let Err(err) = self.send_wire(&module, wire) {
                        warn!(%err, "dropping send effect");
                    }
                }
                Effect::App(e) => app.push(e),
            }
        }
        app
    }
}

impl<S, Mo, E> Default for FunnelTable<S, Mo, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, Mo, E> fmt::Debug for FunnelTable<S, Mo, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FunnelTable").field("modules", &names).finish()
    }
}

trait ErasedEntry<S, Mo, E> {
    fn dispatch(
        &self,
        envelope: &Envelope,
        state: &mut S,
        model: &mut Mo,
    ) -> Result<Vec<Effect<E>>, FunnelError>;

    fn channel(&self) -> &dyn Channel;
}

struct Entry<F: FunnelModule, S, Mo, E> {
    module: F,
    accessor: StateAccessor<S, F::State>,
    channel: Box<dyn Channel>,
    handler: Handler<F::Message, S, Mo, E>,
}

impl<F, S, Mo, E> ErasedEntry<S, Mo, E> for Entry<F, S, Mo, E>
where
    F: FunnelModule,
{
    fn dispatch(
        &self,
        envelope: &Envelope,
        state: &mut S,
        model: &mut Mo,
    ) -> Result<Vec<Effect<E>>, FunnelError> {
        let msg = self.module.decode(envelope).map_err(|error| {
            warn!(module = self.module.name(), %error, "module rejected message");
            FunnelError::Message {
                module: self.module.name().to_string(),
                error,
            }
        })?;

        // Nothing below this point can fail, which is what keeps a failed
        // dispatch from leaving state half-updated.
        let sub = self.accessor.get(state);
        let (sub, response) = self.module.process(msg, sub);
        self.accessor.set(sub, state);

        let mut effects = Vec::new();
        for command in response.commands() {
            effects.push(Effect::Send {
                module: self.module.name().to_string(),
                wire: self.module.encode(command).to_wire(),
            });
        }
        // The handler always runs, even for a no-op response such as a
        // startup acknowledgment.
        for e in (self.handler)(&response, state, model) {
            effects.push(Effect::App(e));
        }
        Ok(effects)
    }

    fn channel(&self) -> &dyn Channel {
        self.channel.as_ref()
    }
}
