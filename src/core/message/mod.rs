//! Typed message payloads.
//!
//! Every message carries a [`Header`] (sequence number and timestamp) plus a
//! flat set of scalar fields described by a per-type [`Schema`]. The schema
//! fixes field order (lexicographic by name), which is what makes the replay
//! text format positional and parseable; see [`format`].
//!
//! Most message types are declared with the [`message!`](crate::message!) macro,
//! which derives everything below.

pub mod format;
mod macros;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::error::MessageError;
use crate::core::{AsAny, TypeTag};

pub use format::{FieldSpec, Schema};

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Sequence number and timestamp shared by every message.
///
/// Neither takes part in message equality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    pub seq: u64,
    /// Seconds since the UNIX epoch.
    pub stamp: f64,
}

impl Header {
    /// Stamps a new header with the next process-wide sequence number and the current time.
    pub fn next() -> Self {
        Self {
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
            stamp: now_secs(),
        }
    }

    /// A header with explicitly supplied values, as read back from a recording.
    pub fn with(seq: u64, stamp: f64) -> Self {
        Self { seq, stamp }
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::next()
    }
}

pub(crate) fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// The shape of a field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Float,
    Text,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Integer => write!(f, "integer"),
            FieldKind::Float => write!(f, "float"),
            FieldKind::Text => write!(f, "text"),
        }
    }
}

impl FieldKind {
    /// Reads a raw captured group as a value of this kind.
    pub fn coerce(self, field: &str, raw: &str) -> Result<FieldValue, MessageError> {
        let bad = || MessageError::Coerce {
            field: field.to_string(),
            kind: self,
            raw: raw.to_string(),
        };
        match self {
            FieldKind::Integer => raw.parse::<i64>().map(FieldValue::Integer).map_err(|_| bad()),
            FieldKind::Float => raw.parse::<f64>().map(FieldValue::Float).map_err(|_| bad()),
            FieldKind::Text => Ok(FieldValue::Text(format::unescape_text(raw))),
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Float(_) => FieldKind::Float,
            FieldValue::Text(_) => FieldKind::Text,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Integer(i) => serde_json::json!(i),
            FieldValue::Float(x) => serde_json::json!(x),
            FieldValue::Text(s) => serde_json::json!(s),
        }
    }
}

/// Rust types usable as message fields.
pub trait FieldType: Sized {
    const KIND: FieldKind;

    fn to_value(&self) -> FieldValue;

    fn from_value(value: FieldValue, field: &str) -> Result<Self, MessageError>;
}

fn mismatch(field: &str, expected: FieldKind, actual: &FieldValue) -> MessageError {
    MessageError::KindMismatch {
        field: field.to_string(),
        expected,
        actual: actual.kind(),
    }
}

macro_rules! integer_field {
    ($($t:ty),*) => {$(
        impl FieldType for $t {
            const KIND: FieldKind = FieldKind::Integer;

            fn to_value(&self) -> FieldValue {
                FieldValue::Integer(i64::from(*self))
            }

            fn from_value(value: FieldValue, field: &str) -> Result<Self, MessageError> {
                match value {
                    FieldValue::Integer(i) => <$t>::try_from(i).map_err(|_| MessageError::Coerce {
                        field: field.to_string(),
                        kind: FieldKind::Integer,
                        raw: i.to_string(),
                    }),
                    other => Err(mismatch(field, FieldKind::Integer, &other)),
                }
            }
        }
    )*};
}

integer_field!(i8, i16, i32, i64, u8, u16, u32);

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_value(&self) -> FieldValue {
        FieldValue::Float(*self)
    }

    fn from_value(value: FieldValue, field: &str) -> Result<Self, MessageError> {
        match value {
            FieldValue::Float(x) => Ok(x),
            FieldValue::Integer(i) => Ok(i as f64),
            other => Err(mismatch(field, FieldKind::Float, &other)),
        }
    }
}

impl FieldType for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_value(&self) -> FieldValue {
        FieldValue::Float(f64::from(*self))
    }

    fn from_value(value: FieldValue, field: &str) -> Result<Self, MessageError> {
        f64::from_value(value, field).map(|x| x as f32)
    }
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_value(value: FieldValue, field: &str) -> Result<Self, MessageError> {
        match value {
            FieldValue::Text(s) => Ok(s),
            other => Err(mismatch(field, FieldKind::Text, &other)),
        }
    }
}

/// A typed payload that can travel over an edge.
///
/// Object safe: edges carry `Box<dyn Message>` and consumers downcast with
/// [`Inbox::recv_as`](crate::Inbox::recv_as).
pub trait Message: AsAny + fmt::Debug + Send + Sync {
    fn header(&self) -> &Header;

    /// The concrete type's name, as it appears at the start of a replay line.
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> &'static Schema;

    /// Reads one field by name. `None` for names outside the schema.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Deep copy. The copy shares nothing with `self`.
    fn clone_message(&self) -> Box<dyn Message>;

    fn type_tag(&self) -> TypeTag {
        TypeTag::from_parts(self.as_any().type_id(), self.type_name())
    }

    /// Equality over every schema field; the header is ignored.
    fn eq_message(&self, other: &dyn Message) -> bool {
        if self.as_any().type_id() != other.as_any().type_id() {
            return false;
        }
        self.schema()
            .fields()
            .iter()
            .all(|spec| self.field(spec.name()) == other.field(spec.name()))
    }

    /// Renders the replay line for this message.
    fn render(&self) -> String {
        format::render(self)
    }

    /// A compact description for log lines.
    fn log_summary(&self) -> String {
        format!("{}#{}", self.type_name(), self.header().seq)
    }
}

impl Clone for Box<dyn Message> {
    fn clone(&self) -> Self {
        self.clone_message()
    }
}

impl PartialEq for dyn Message {
    fn eq(&self, other: &Self) -> bool {
        self.eq_message(other)
    }
}

/// The sized side of a message type: construction and parsing.
pub trait Record: Message + Default + Clone + Sized + 'static {
    const TYPE_NAME: &'static str;

    fn schema_static() -> &'static Schema;

    /// An instance carrying `header`, every field at its default.
    ///
    /// Unlike `Default`, this does not draw a sequence number.
    fn from_header(header: Header) -> Self;

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), MessageError>;

    /// Parses one replay line. `Ok(None)` means the line is not this type.
    fn parse(line: &str) -> Result<Option<Self>, MessageError> {
        format::parse::<Self>(line)
    }

    fn type_tag_static() -> TypeTag {
        TypeTag::of::<Self>()
    }
}

/// A JSON view of a message: `{"type": .., "n": .., "t": .., <fields>}`.
pub fn message_to_json(message: &dyn Message) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("type".into(), serde_json::json!(message.type_name()));
    map.insert("n".into(), serde_json::json!(message.header().seq));
    map.insert("t".into(), serde_json::json!(message.header().stamp));
    for spec in message.schema().fields() {
        if let Some(value) = message.field(spec.name()) {
            map.insert(spec.name().to_string(), value.to_json());
        }
    }
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    crate::message! {
        pub struct Pose {
            pub frame: String,
            pub x: f64,
            pub y: f64,
            pub tick: i32,
        }
    }

    crate::message! {
        pub struct Other {
            pub x: f64,
        }
    }

    #[test]
    fn test_headers_are_monotonic() {
        let a = Header::next();
        let b = Header::next();
        assert!(b.seq > a.seq);
        assert!(b.stamp >= a.stamp);
    }

    #[test]
    fn test_equality_ignores_header() {
        let a = Pose {
            frame: "map".into(),
            x: 1.5,
            ..Default::default()
        };
        let mut b = a.clone();
        b.header = Header::with(999, 0.0);
        assert_eq!(a, b);
        assert!(a.eq_message(&b));

        b.x = 2.0;
        assert_ne!(a, b);
    }

    #[test]
    fn test_eq_message_rejects_other_types() {
        let a = Pose::default();
        let b = Other::default();
        assert!(!a.eq_message(&b));
    }

    #[test]
    fn test_clone_message_is_independent() {
        let original = Pose {
            frame: "odom".into(),
            ..Default::default()
        };
        let copy = original.clone_message();
        let mut typed = copy.into_any().downcast::<Pose>().unwrap();
        typed.frame.push_str("_changed");
        assert_eq!(original.frame, "odom");
        assert_eq!(typed.frame, "odom_changed");
    }

    #[test]
    fn test_field_access_and_kinds() {
        let p = Pose {
            frame: "base".into(),
            x: 0.25,
            y: -3.0,
            tick: 7,
            ..Default::default()
        };
        assert_eq!(p.field("tick"), Some(FieldValue::Integer(7)));
        assert_eq!(p.field("frame"), Some(FieldValue::Text("base".into())));
        assert_eq!(p.field("nope"), None);
        assert_eq!(p.type_tag(), TypeTag::of::<Pose>());
    }

    #[test]
    fn test_static_type_tag_matches_the_instance_tag() {
        fn tag_of<R: Record>() -> TypeTag {
            R::type_tag_static()
        }
        assert_eq!(tag_of::<Pose>(), Pose::default().type_tag());
        assert_ne!(tag_of::<Pose>(), tag_of::<Other>());
    }

    #[test]
    fn test_set_field_checks_kind_and_range() {
        let mut p = Pose::default();
        p.set_field("tick", FieldValue::Integer(12)).unwrap();
        assert_eq!(p.tick, 12);

        assert!(matches!(
            p.set_field("tick", FieldValue::Integer(i64::MAX)),
            Err(MessageError::Coerce { .. })
        ));
        assert!(matches!(
            p.set_field("frame", FieldValue::Float(1.0)),
            Err(MessageError::KindMismatch { .. })
        ));
        assert!(matches!(
            p.set_field("z", FieldValue::Float(1.0)),
            Err(MessageError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_message_to_json() {
        let p = Pose {
            header: Header::with(4, 1.5),
            frame: "map".into(),
            x: 1.0,
            y: 2.0,
            tick: 3,
        };
        assert_eq!(
            message_to_json(&p),
            json!({"type": "Pose", "n": 4, "t": 1.5, "frame": "map", "x": 1.0, "y": 2.0, "tick": 3})
        );
    }
}
