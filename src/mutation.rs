//! Product mutation requests.
//!
//! A mutation body looks like:
//! ```json
//! { "operation": "insert", "item": { "product_id": 100, "product_name": "...", "product_description": "..." } }
//! ```
//!
//! Validation happens entirely before any store interaction. The decoded body is
//! kept untouched so the exact request can be forwarded to ingestion.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// Operations accepted in the `operation` field.
pub const ALLOWED_OPERATIONS: [&str; 3] = ["insert", "update", "delete"];

/// Mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Insert and update write the descriptive columns; delete only needs the key.
    pub fn requires_attributes(&self) -> bool {
        !matches!(self, Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Operation::Insert),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(other.to_string()),
        }
    }
}

/// Rejected mutation body.
///
/// The display form is the caller-facing message; `reason` is for logs only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid payload: {body}. Allowed operations are insert/update/delete, followed by item.")]
pub struct ValidationError {
    body: String,
    reason: String,
}

impl ValidationError {
    fn new(body: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            reason: reason.into(),
        }
    }

    /// Rendered body that failed validation.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Why the body was rejected.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Render a decoded body for messages and logs.
pub fn render_body(body: &Value) -> String {
    body.to_string()
}

/// Decode a raw request body into JSON.
///
/// Absent, blank, or unparsable bodies are rejected with the same message as a
/// malformed mutation.
pub fn decode_body(body: Option<&str>) -> Result<Value, ValidationError> {
    let text = body
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ValidationError::new("", "request body is empty"))?;

    serde_json::from_str(text)
        .map_err(|e| ValidationError::new(text, format!("body is not valid JSON: {}", e)))
}

/// Product row addressed by a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Partition key (CQL `int`).
    pub product_id: i32,
    pub product_name: Option<String>,
    pub product_description: Option<String>,
}

impl Product {
    /// Name and description, present for every validated insert/update.
    pub fn attributes(&self) -> Option<(&str, &str)> {
        match (&self.product_name, &self.product_description) {
            (Some(name), Some(description)) => Some((name.as_str(), description.as_str())),
            _ => None,
        }
    }
}

/// A validated mutation together with the body it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    operation: Operation,
    product: Product,
    raw: Value,
}

impl MutationRequest {
    /// Validate a decoded body.
    pub fn from_value(raw: Value) -> Result<Self, ValidationError> {
        let operation = raw
            .get("operation")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(&raw, "operation is missing or not a string"))?
            .parse::<Operation>()
            .map_err(|op| invalid(&raw, format!("unsupported operation `{}`", op)))?;

        let item = raw
            .get("item")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid(&raw, "item is missing or not an object"))?;

        let product_id = item
            .get("product_id")
            .and_then(Value::as_i64)
            .and_then(|id| i32::try_from(id).ok())
            .ok_or_else(|| invalid(&raw, "product_id must be a 32-bit integer"))?;

        let text = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_owned);
        let product = Product {
            product_id,
            product_name: text("product_name"),
            product_description: text("product_description"),
        };

        if operation.requires_attributes() && product.attributes().is_none() {
            return Err(invalid(
                &raw,
                format!(
                    "{} requires string product_name and product_description",
                    operation
                ),
            ));
        }

        Ok(Self {
            operation,
            product,
            raw,
        })
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    /// The body exactly as received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Rendered body for messages.
    pub fn body(&self) -> String {
        render_body(&self.raw)
    }
}

fn invalid(raw: &Value, reason: impl Into<String>) -> ValidationError {
    ValidationError::new(render_body(raw), reason)
}
