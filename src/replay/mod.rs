//! Replaying recorded traffic.
//!
//! A recording is plain text, one rendered message per line (see
//! [`Message::render`](crate::Message::render)). The [`ReplayRegistry`] turns
//! lines back into messages and the [`LogReplayer`] node broadcasts them.

mod replayer;

pub use replayer::{LogReplayer, ReplayConfig};

use crate::core::error::MessageError;
use crate::core::message::{Message, Record};

type LineParser = Box<dyn Fn(&str) -> Result<Option<Box<dyn Message>>, MessageError> + Send + Sync>;

/// One parsed line of a recording.
#[derive(Debug)]
pub enum Replayed {
    Message(Box<dyn Message>),
    /// No registered type matched; the raw line.
    Opaque(String),
}

/// The message types a recording may contain, tried in registration order.
#[derive(Default)]
pub struct ReplayRegistry {
    parsers: Vec<(&'static str, LineParser)>,
}

impl ReplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `R`. Registering the same type twice has no effect.
    pub fn register<R: Record + 'static>(&mut self) -> &mut Self {
        if self.parsers.iter().any(|(name, _)| *name == R::TYPE_NAME) {
            return self;
        }
        let parser: LineParser = Box::new(|line| {
            Ok(R::parse(line)?.map(|record| Box::new(record) as Box<dyn Message>))
        });
        self.parsers.push((R::TYPE_NAME, parser));
        self
    }

    pub fn with<R: Record + 'static>(mut self) -> Self {
        self.register::<R>();
        self
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parsers.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Parses one line with the first registered type whose pattern matches.
    ///
    /// A line that matches a type but holds an unreadable field is an error,
    /// not an opaque line.
    pub fn parse_line(&self, line: &str) -> Result<Replayed, MessageError> {
        for (_, parser) in &self.parsers {
            if let Some(message) = parser(line)? {
                return Ok(Replayed::Message(message));
            }
        }
        Ok(Replayed::Opaque(line.to_string()))
    }
}

impl std::fmt::Debug for ReplayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.type_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Header;

    crate::message! {
        pub struct Odometry {
            pub ticks: i64,
            pub speed: f64,
        }
    }

    crate::message! {
        pub struct Status {
            pub text: String,
        }
    }

    #[test]
    fn test_parse_line_picks_matching_type() {
        let registry = ReplayRegistry::new().with::<Odometry>().with::<Status>();
        assert_eq!(registry.len(), 2);

        let status = Status {
            header: Header::with(4, 1.5),
            text: "it's ok".into(),
        };
        match registry.parse_line(&status.render()).unwrap() {
            Replayed::Message(message) => {
                let parsed = message.into_any().downcast::<Status>().unwrap();
                assert_eq!(*parsed, status);
                assert_eq!(parsed.header.seq, 4);
            }
            Replayed::Opaque(line) => panic!("expected a Status, got opaque '{}'", line),
        }
    }

    #[test]
    fn test_unknown_line_is_opaque() {
        let registry = ReplayRegistry::new().with::<Odometry>();
        match registry.parse_line("Battery(n=1, t=0.0, volts=11.9)").unwrap() {
            Replayed::Opaque(line) => assert!(line.starts_with("Battery")),
            Replayed::Message(m) => panic!("unexpected {:?}", m),
        }
    }

    #[test]
    fn test_coercion_failure_is_an_error() {
        let registry = ReplayRegistry::new().with::<Odometry>();
        let line = "Odometry(n=1, t=0.0, speed=1.0, ticks=99999999999999999999)";
        assert!(matches!(
            registry.parse_line(line),
            Err(MessageError::Coerce { .. })
        ));
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = ReplayRegistry::new();
        registry.register::<Status>().register::<Status>();
        assert_eq!(registry.type_names().collect::<Vec<_>>(), vec!["Status"]);
    }
}
