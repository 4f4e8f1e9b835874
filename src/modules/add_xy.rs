//! Integer arithmetic reference module. The application sends `add` or
//! `multiply` requests; the backend answers with `sum` or `product`
//! messages carrying the operands alongside the result.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::envelope::Envelope;
use crate::error::MessageError;
use crate::funnel::{FunnelModule, Response};

pub const NAME: &str = "AddXY";

#[derive(Debug, Clone, Copy, Default)]
pub struct AddXy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddXyMessage {
    Add { x: i64, y: i64 },
    Multiply { x: i64, y: i64 },
    Sum { x: i64, y: i64, result: i64 },
    Product { x: i64, y: i64, result: i64 },
    Startup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddXyState {
    /// Messages seen, newest first.
    pub history: Vec<AddXyMessage>,
    pub was_loaded: bool,
}

#[derive(Deserialize)]
struct Operands {
    x: i64,
    y: i64,
}

#[derive(Deserialize)]
struct Answer {
    x: i64,
    y: i64,
    result: i64,
}

impl FunnelModule for AddXy {
    type Message = AddXyMessage;
    type State = AddXyState;

    fn name(&self) -> &str {
        NAME
    }

    fn encode(&self, msg: &AddXyMessage) -> Envelope {
        let (tag, args) = match *msg {
            AddXyMessage::Add { x, y } => ("add", json!({"x": x, "y": y})),
            AddXyMessage::Multiply { x, y } => ("multiply", json!({"x": x, "y": y})),
            AddXyMessage::Sum { x, y, result } => {
                ("sum", json!({"x": x, "y": y, "result": result}))
            }
            AddXyMessage::Product { x, y, result } => {
                ("product", json!({"x": x, "y": y, "result": result}))
            }
            AddXyMessage::Startup => ("startup", Value::Null),
        };
        Envelope::new(NAME, tag, args)
    }

    fn decode(&self, envelope: &Envelope) -> Result<AddXyMessage, MessageError> {
        let tag = envelope.tag.as_str();
        match tag {
            "add" | "multiply" => {
                let Operands { x, y } = decode_args(tag, &envelope.args)?;
                Ok(match tag {
                    "add" => AddXyMessage::Add { x, y },
                    _ => AddXyMessage::Multiply { x, y },
                })
            }
            "sum" | "product" => {
                let Answer { x, y, result } = decode_args(tag, &envelope.args)?;
                Ok(match tag {
                    "sum" => AddXyMessage::Sum { x, y, result },
                    _ => AddXyMessage::Product { x, y, result },
                })
            }
            "startup" => Ok(AddXyMessage::Startup),
            other => Err(MessageError::UnknownTag(other.to_string())),
        }
    }

    fn process(
        &self,
        msg: AddXyMessage,
        mut state: AddXyState,
    ) -> (AddXyState, Response<AddXyMessage>) {
        match msg {
            AddXyMessage::Startup => {
                state.was_loaded = true;
                (state, Response::None)
            }
            msg => {
                state.history.insert(0, msg.clone());
                (state, Response::Message(msg))
            }
        }
    }
}

fn decode_args<T: DeserializeOwned>(tag: &str, args: &Value) -> Result<T, MessageError> {
    T::deserialize(args).map_err(|err| MessageError::bad_args(tag, err.to_string()))
}

/// Simulation of the arithmetic backend: requests are answered immediately,
/// everything else is ignored.
pub fn simulate(msg: AddXyMessage) -> Option<AddXyMessage> {
    match msg {
        AddXyMessage::Add { x, y } => Some(AddXyMessage::Sum {
            x,
            y,
            result: x.wrapping_add(y),
        }),
        AddXyMessage::Multiply { x, y } => Some(AddXyMessage::Product {
            x,
            y,
            result: x.wrapping_mul(y),
        }),
        AddXyMessage::Sum { .. } | AddXyMessage::Product { .. } | AddXyMessage::Startup => None,
    }
}
