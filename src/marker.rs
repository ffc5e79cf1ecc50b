//! Injection markers
//!
//! The `Component` derive decodes the arguments of each `#[inject]` attribute at compile
//! time and records the result as a [RawMarker]:
//!
//! | attribute                   | raw marker                 | meaning             |
//! |-----------------------------|----------------------------|---------------------|
//! | `#[inject]`                 | `Name("")`                 | unnamed injection   |
//! | `#[inject("db")]`           | `Name("db")`               | provider named `db` |
//! | `#[inject(r"db")]`          | `Name("db")`               | provider named `db` |
//! | `#[inject(name = "db")]`    | `Name("db")`               | provider named `db` |
//! | `#[inject(label = "db")]`   | `Rejected { .. }`          | malformed marker    |
//!
//! Names are decoded as Rust string literals (escapes and raw strings included).
//! An empty name is the same as no name. A rejected marker is only reported when the
//! field is visited, as [crate::WiringError::MalformedInjectionMarker].

use thiserror::Error;

/// Injection marker as recorded by the derive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawMarker {
    /// Decoded provider name, empty for unnamed injection
    Name(&'static str),
    /// Attribute arguments which could not be decoded
    Rejected {
        tokens: &'static str,
        reason: &'static str,
    },
}

impl RawMarker {
    /// Text of the marker, as written in the attribute
    pub fn text(&self) -> &'static str {
        match *self {
            RawMarker::Name(name) => name,
            RawMarker::Rejected { tokens, .. } => tokens,
        }
    }
}

/// Parsed injection marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marker {
    name: Option<String>,
}

impl Marker {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: (!name.is_empty()).then_some(name),
        }
    }

    /// Explicit provider name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Syntax error in an injection marker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct MarkerError {
    reason: &'static str,
}

impl MarkerError {
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

/// Turn a recorded marker into a provider selection
pub fn parse(raw: RawMarker) -> Result<Marker, MarkerError> {
    match raw {
        RawMarker::Name(name) => Ok(Marker::named(name)),
        RawMarker::Rejected { reason, .. } => Err(MarkerError { reason }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_unnamed() {
        assert_eq!(parse(RawMarker::Name("")).unwrap().name(), None);
        assert_eq!(Marker::named(""), Marker::default());
    }

    #[test]
    fn names_are_kept_verbatim() {
        assert_eq!(parse(RawMarker::Name("db")).unwrap().name(), Some("db"));
        assert_eq!(parse(RawMarker::Name("tab\tname")).unwrap().name(), Some("tab\tname"));
        assert_eq!(parse(RawMarker::Name(" db ")).unwrap().name(), Some(" db "));
    }

    #[test]
    fn rejected_markers_keep_their_reason() {
        let raw = RawMarker::Rejected {
            tokens: "label = \"db\"",
            reason: "unknown marker key `label`, expected `name`",
        };
        assert_eq!(raw.text(), "label = \"db\"");
        let err = parse(raw).unwrap_err();
        assert_eq!(err.reason(), "unknown marker key `label`, expected `name`");
        assert_eq!(err.to_string(), err.reason());
    }
}
