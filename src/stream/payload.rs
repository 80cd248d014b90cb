//! Data carried by a loaded leaf stream.

use crate::harp::RegisterData;
use arrow::record_batch::RecordBatch;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// A deserialized, strongly-typed document (the serde analogue of a schema model).
///
/// The value is shared behind an `Arc` so cloning a payload never copies the model.
#[derive(Clone)]
pub struct ModelData {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl ModelData {
    /// Wraps a deserialized value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: short_type_name(type_name::<T>()),
            value: Arc::new(value),
        }
    }

    /// Short name of the stored type, e.g. `Session` or `Vec<Trial>`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The model as `T`, if that is its type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for ModelData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model<{}>", self.type_name)
    }
}

impl PartialEq for ModelData {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

/// Strips the module path of the outermost type, e.g. `alloc::vec::Vec<a::B>` -> `Vec<a::B>`.
fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// Application data held by a loaded leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Typed columns; see [`crate::table`] for index and rename helpers.
    Table(RecordBatch),
    /// A JSON document.
    Json(serde_json::Value),
    /// UTF-8 text.
    Text(String),
    /// Decoded harp register messages.
    Harp(RegisterData),
    /// A typed model; see [`Payload::as_model`].
    Model(ModelData),
}

impl Payload {
    /// Runtime type label used by summaries and the tree printer.
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Table(_) => "Table",
            Payload::Json(_) => "Json",
            Payload::Text(_) => "Text",
            Payload::Harp(_) => "HarpRegister",
            Payload::Model(model) => model.type_name(),
        }
    }

    /// The record batch, for tabular payloads.
    pub fn as_table(&self) -> Option<&RecordBatch> {
        match self {
            Payload::Table(t) => Some(t),
            _ => None,
        }
    }

    /// The JSON value, for JSON payloads.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(v) => Some(v),
            _ => None,
        }
    }

    /// The text, for text payloads.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Decoded register messages, for harp payloads.
    pub fn as_harp(&self) -> Option<&RegisterData> {
        match self {
            Payload::Harp(r) => Some(r),
            _ => None,
        }
    }

    /// A typed model, if the payload holds a `T`.
    pub fn as_model<T: Any>(&self) -> Option<&T> {
        match self {
            Payload::Model(m) => m.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl From<RecordBatch> for Payload {
    fn from(value: RecordBatch) -> Self {
        Payload::Table(value)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<RegisterData> for Payload {
    fn from(value: RegisterData) -> Self {
        Payload::Harp(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Session {
        subject: String,
    }

    #[test]
    fn model_payload_downcasts_to_its_type() {
        let payload = Payload::Model(ModelData::new(Session {
            subject: "mouse-7".into(),
        }));
        assert_eq!(payload.type_name(), "Session");
        assert_eq!(
            payload.as_model::<Session>().map(|s| s.subject.as_str()),
            Some("mouse-7")
        );
        assert!(payload.as_model::<String>().is_none());
    }

    #[test]
    fn accessors_match_variants() {
        let payload = Payload::from("hello".to_string());
        assert_eq!(payload.as_text(), Some("hello"));
        assert!(payload.as_table().is_none());
        assert_eq!(payload.type_name(), "Text");
    }
}
