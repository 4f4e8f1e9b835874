//! String-echo reference module. The backend (real or simulated) echoes
//! every request back. A request starting with `$` additionally makes the
//! module re-send the rest of the string as a second request, exercising the
//! self-directed command path.

use serde_json::{Value, json};

use crate::envelope::Envelope;
use crate::error::MessageError;
use crate::funnel::{FunnelModule, Response};

pub const NAME: &str = "Echo";

#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoMessage {
    /// Tag `"request"`, args = the string to echo.
    Request(String),
    /// Tag `"startup"`, sent by a live backend once its script is loaded.
    Startup,
}

/// Echo's slice of application state: echoed strings, newest first, plus
/// whether a real backend announced itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoState {
    pub history: Vec<String>,
    pub was_loaded: bool,
}

impl FunnelModule for Echo {
    type Message = EchoMessage;
    type State = EchoState;

    fn name(&self) -> &str {
        NAME
    }

    fn encode(&self, msg: &EchoMessage) -> Envelope {
        match msg {
            EchoMessage::Request(s) => Envelope::new(NAME, "request", json!(s)),
            EchoMessage::Startup => Envelope::new(NAME, "startup", Value::Null),
        }
    }

    fn decode(&self, envelope: &Envelope) -> Result<EchoMessage, MessageError> {
        match envelope.tag.as_str() {
            "request" => match envelope.args.as_str() {
                Some(s) => Ok(EchoMessage::Request(s.to_string())),
                None => Err(MessageError::bad_args("request", "args must be a string")),
            },
            "startup" => Ok(EchoMessage::Startup),
            other => Err(MessageError::UnknownTag(other.to_string())),
        }
    }

    fn process(&self, msg: EchoMessage, mut state: EchoState) -> (EchoState, Response<EchoMessage>) {
        match msg {
            EchoMessage::Startup => {
                state.was_loaded = true;
                (state, Response::None)
            }
            EchoMessage::Request(s) => {
                state.history.insert(0, s.clone());
                let response = match s.strip_prefix('$') {
                    Some(rest) => Response::Batch(vec![
                        Response::Message(EchoMessage::Request(s.clone())),
                        Response::Command(EchoMessage::Request(rest.to_string())),
                    ]),
                    None => Response::Message(EchoMessage::Request(s)),
                };
                (state, response)
            }
        }
    }
}

/// Simulation of the echo backend: requests come straight back.
pub fn simulate(msg: EchoMessage) -> Option<EchoMessage> {
    match msg {
        EchoMessage::Request(s) => Some(EchoMessage::Request(s)),
        EchoMessage::Startup => None,
    }
}
