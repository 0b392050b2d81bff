//! The replay text format.
//!
//! One message per line:
//!
//! ```text
//! Reading(n=12, t=1700000000.25, sensor='left arm', value=0.5)
//! ```
//!
//! `n` and `t` always come first. The remaining fields follow in
//! lexicographic order of their names; identity on the wire is positional, so
//! the same [`Schema`] order is used to build the template, to build the
//! extraction pattern and to read captured groups back.

use regex::Regex;

use super::{FieldKind, FieldValue, Header, Message, Record};
use crate::core::error::MessageError;

const INTEGER_PATTERN: &str = r"([-+]?\d+)";
const FLOAT_PATTERN: &str = r"([-+]?(?:(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?|(?i:inf|nan)))";
const TEXT_PATTERN: &str = r"'((?:\\'|[^'])*?)'";

/// Header names reserved on the wire.
const RESERVED: [&str; 2] = ["n", "t"];

/// One `(name, kind)` entry of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: &'static str,
    kind: FieldKind,
}

impl FieldSpec {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// The per-type description of a message's fields, built once and cached.
#[derive(Debug)]
pub struct Schema {
    type_name: &'static str,
    fields: Vec<FieldSpec>,
    template: String,
    pattern: Regex,
}

impl Schema {
    /// Builds a schema. Fields are sorted by name here, whatever order they were declared in.
    pub fn new(
        type_name: &'static str,
        fields: &[(&'static str, FieldKind)],
    ) -> Result<Self, MessageError> {
        let mut fields: Vec<FieldSpec> = fields
            .iter()
            .map(|&(name, kind)| FieldSpec { name, kind })
            .collect();
        fields.sort_by(|a, b| a.name.cmp(b.name));

        let invalid = |reason: String| MessageError::Schema {
            type_name: type_name.to_string(),
            reason,
        };
        if let Some(spec) = fields.iter().find(|f| RESERVED.contains(&f.name)) {
            return Err(invalid(format!("field name '{}' is reserved", spec.name)));
        }
        if let Some(pair) = fields.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(invalid(format!("field '{}' is declared twice", pair[0].name)));
        }

        let mut template = format!("{type_name}(n=<seq>, t=<stamp>");
        let mut pattern = format!(
            r"^\s*{}\(n={}, t={}",
            regex::escape(type_name),
            INTEGER_PATTERN,
            FLOAT_PATTERN
        );
        for spec in &fields {
            let (placeholder, group) = match spec.kind {
                FieldKind::Integer => ("<int>".to_string(), INTEGER_PATTERN),
                FieldKind::Float => ("<float>".to_string(), FLOAT_PATTERN),
                FieldKind::Text => ("'<text>'".to_string(), TEXT_PATTERN),
            };
            template.push_str(&format!(", {}={}", spec.name, placeholder));
            pattern.push_str(&format!(", {}={}", regex::escape(spec.name), group));
        }
        template.push(')');
        pattern.push_str(r"\)\s*$");

        Ok(Self {
            type_name,
            fields,
            template,
            pattern: Regex::new(&pattern)?,
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fields in wire order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// A human-readable template, e.g. `Reading(n=<seq>, t=<stamp>, value=<float>)`.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

/// Renders a message as one replay line, fields in schema order.
pub fn render<M: Message + ?Sized>(message: &M) -> String {
    let header = message.header();
    let mut line = format!(
        "{}(n={}, t={}",
        message.type_name(),
        header.seq,
        render_float(header.stamp)
    );
    for spec in message.schema().fields() {
        let value = message.field(spec.name()).unwrap_or_else(|| match spec.kind() {
            FieldKind::Integer => FieldValue::Integer(0),
            FieldKind::Float => FieldValue::Float(0.0),
            FieldKind::Text => FieldValue::Text(String::new()),
        });
        let rendered = match value {
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(x) => render_float(x),
            FieldValue::Text(s) => format!("'{}'", escape_text(&s)),
        };
        line.push_str(&format!(", {}={}", spec.name(), rendered));
    }
    line.push(')');
    line
}

/// Parses one replay line into `R`. `Ok(None)` when the line is not an `R`.
pub fn parse<R: Record>(line: &str) -> Result<Option<R>, MessageError> {
    let schema = R::schema_static();
    let Some(caps) = schema.pattern().captures(line) else {
        return Ok(None);
    };
    let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");

    let seq = group(1).parse::<u64>().map_err(|_| MessageError::Coerce {
        field: "n".into(),
        kind: FieldKind::Integer,
        raw: group(1).to_string(),
    })?;
    let stamp = match FieldKind::Float.coerce("t", group(2))? {
        FieldValue::Float(x) => x,
        _ => 0.0,
    };

    let mut record = R::from_header(Header::with(seq, stamp));
    for (i, spec) in schema.fields().iter().enumerate() {
        let value = spec.kind().coerce(spec.name(), group(i + 3))?;
        record.set_field(spec.name(), value)?;
    }
    Ok(Some(record))
}

/// Shortest round-trip representation, always with a `.` or an exponent.
fn render_float(x: f64) -> String {
    format!("{x:?}")
}

/// Text goes inside the quotes as written; only a quote is escaped, as `\'`.
fn escape_text(s: &str) -> String {
    s.replace('\'', "\\'")
}

/// Undoes [`escape_text`]. Any other backslash is kept as it is.
pub(crate) fn unescape_text(s: &str) -> String {
    s.replace("\\'", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::message! {
        pub struct Reading {
            pub value: f64,
        }
    }

    crate::message! {
        /// Declared out of order on purpose.
        pub struct Status {
            pub zone: String,
            pub count: i64,
            pub level: f64,
            pub alpha: String,
        }
    }

    crate::message! {
        pub struct Empty {}
    }

    #[test]
    fn test_schema_sorts_fields() {
        let names: Vec<_> = Status::schema_static()
            .fields()
            .iter()
            .map(|f| f.name())
            .collect();
        assert_eq!(names, vec!["alpha", "count", "level", "zone"]);
        assert_eq!(
            Status::schema_static().template(),
            "Status(n=<seq>, t=<stamp>, alpha='<text>', count=<int>, level=<float>, zone='<text>')"
        );
    }

    #[test]
    fn test_schema_is_cached_per_type() {
        assert!(std::ptr::eq(
            Reading::schema_static(),
            Reading::default().schema()
        ));
    }

    #[test]
    fn test_schema_rejects_reserved_and_duplicate_names() {
        assert!(Schema::new("Bad", &[("n", FieldKind::Integer)]).is_err());
        assert!(Schema::new("Bad", &[("a", FieldKind::Integer), ("a", FieldKind::Text)]).is_err());
    }

    #[test]
    fn test_render_is_bit_exact() {
        let status = Status {
            header: Header::with(3, 1.5),
            zone: "dock 2".into(),
            count: -4,
            level: 0.5,
            alpha: "a".into(),
        };
        assert_eq!(
            status.render(),
            "Status(n=3, t=1.5, alpha='a', count=-4, level=0.5, zone='dock 2')"
        );
    }

    #[test]
    fn test_parse_reads_recorded_line() {
        let line = "Reading(n=12, t=1700000000.25, value=-2.5e-3)";
        let reading = Reading::parse(line).unwrap().unwrap();
        assert_eq!(reading.header.seq, 12);
        assert_eq!(reading.header.stamp, 1700000000.25);
        assert_eq!(reading.value, -0.0025);
    }

    #[test]
    fn test_parse_accepts_bare_integer_float() {
        let reading = Reading::parse("Reading(n=1, t=2, value=3)").unwrap().unwrap();
        assert_eq!(reading.value, 3.0);
    }

    #[test]
    fn test_parse_wrong_type_is_not_an_error() {
        assert!(Reading::parse("Status(n=1, t=0.0, alpha='', count=1, level=1.0, zone='')")
            .unwrap()
            .is_none());
        assert!(Reading::parse("some free text").unwrap().is_none());
        assert!(Reading::parse("ReadingX(n=1, t=0.0, value=1.0)").unwrap().is_none());
    }

    #[test]
    fn test_parse_out_of_range_integer_is_an_error() {
        let line = "Status(n=1, t=0.0, alpha='', count=99999999999999999999, level=1.0, zone='')";
        assert!(matches!(
            Status::parse(line),
            Err(MessageError::Coerce { .. })
        ));
    }

    #[test]
    fn test_round_trip_edge_values() {
        let cases = [
            Status {
                zone: String::new(),
                count: 0,
                level: 0.0,
                alpha: String::new(),
                ..Default::default()
            },
            Status {
                zone: "left  wheel front".into(),
                count: -17,
                level: -0.125,
                alpha: " padded ".into(),
                ..Default::default()
            },
            Status {
                zone: "it's a \\path".into(),
                count: i64::MIN,
                level: 1e-300,
                alpha: "x".into(),
                ..Default::default()
            },
        ];
        for original in cases {
            let parsed = Status::parse(&original.render()).unwrap().unwrap();
            assert_eq!(parsed, original);
            assert_eq!(parsed.header, original.header);
        }
    }

    #[test]
    fn test_round_trip_without_fields() {
        let empty = Empty::default();
        let line = empty.render();
        assert_eq!(line, format!("Empty(n={}, t={:?})", empty.header.seq, empty.header.stamp));
        assert_eq!(Empty::parse(&line).unwrap().unwrap().header, empty.header);
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(escape_text("it's"), r"it\'s");
        assert_eq!(escape_text(r"C:\data"), r"C:\data");
        assert_eq!(unescape_text(r"it\'s \\ ok"), r"it's \\ ok");
    }

    crate::message! {
        pub struct Note {
            pub path: String,
        }
    }

    #[test]
    fn test_backslashes_render_verbatim() {
        let note = Note {
            header: Header::with(1, 0.5),
            path: r"C:\data".into(),
        };
        assert_eq!(note.render(), r"Note(n=1, t=0.5, path='C:\data')");
    }

    #[test]
    fn test_external_lines_keep_backslashes() {
        let note = Note::parse(r"Note(n=1, t=0.5, path='C:\data\raw')").unwrap().unwrap();
        assert_eq!(note.path, r"C:\data\raw");

        let note = Note::parse(r"Note(n=2, t=0.5, path='dir\')").unwrap().unwrap();
        assert_eq!(note.path, r"dir\");

        let note = Note::parse(r"Note(n=3, t=0.5, path='it\'s')").unwrap().unwrap();
        assert_eq!(note.path, "it's");
    }

    #[test]
    fn test_round_trip_text_with_backslashes() {
        for path in [r"C:\data\raw", r"dir\", r"\\server\share", r"a\'b", r"\", "'quoted'"] {
            let original = Note {
                header: Header::with(4, 1.0),
                path: path.into(),
            };
            let parsed = Note::parse(&original.render()).unwrap().unwrap();
            assert_eq!(parsed.path, path, "line {}", original.render());
        }
    }

    #[test]
    fn test_parse_accepts_lowercase_nan_and_inf() {
        let reading = Reading::parse("Reading(n=1, t=0.5, value=nan)").unwrap().unwrap();
        assert!(reading.value.is_nan());
        let reading = Reading::parse("Reading(n=1, t=0.5, value=-Inf)").unwrap().unwrap();
        assert_eq!(reading.value, f64::NEG_INFINITY);
    }

    #[test]
    fn test_from_header_keeps_the_given_header() {
        let reading = Reading::from_header(Header::with(9, 0.5));
        assert_eq!(reading.header, Header::with(9, 0.5));
        assert_eq!(reading.value, 0.0);
    }
}
