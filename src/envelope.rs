use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::EnvelopeError;

/// Wire-level unit shared by every funnel module. The host-side dispatcher
/// only ever sees this shape; `args` stays opaque until the target module's
/// decoder looks at it.
///
/// ```json
/// { "module": "Echo", "tag": "request", "args": "hello" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Envelope {
    pub module: String,
    pub tag: String,
    pub args: Value,
}

impl Envelope {
    pub fn new(module: impl Into<String>, tag: impl Into<String>, args: Value) -> Self {
        Self {
            module: module.into(),
            tag: tag.into(),
            args,
        }
    }

    /// Encode for the outbound channel. Total: every envelope has a wire form.
    pub fn to_wire(&self) -> Value {
        json!({
            "module": self.module,
            "tag": self.tag,
            "args": self.args,
        })
    }

    /// Parse an inbound wire value. All-or-nothing: a partial envelope is
    /// rejected with an error naming the first offending field.
    pub fn from_wire(wire: &Value) -> Result<Self, EnvelopeError> {
        let obj = wire.as_object().ok_or(EnvelopeError::NotAnObject)?;
        let module = string_field(obj, "module")?;
        let tag = string_field(obj, "tag")?;
        let args = obj
            .get("args")
            .cloned()
            .ok_or(EnvelopeError::MissingField("args"))?;
        Ok(Self { module, tag, args })
    }
}

fn string_field(
    obj: &serde_json::Map<String, Value>,
    name: &'static str,
) -> Result<String, EnvelopeError> {
    match obj.get(name) {
        None => Err(EnvelopeError::MissingField(name)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(EnvelopeError::NotAString(name)),
    }
}
