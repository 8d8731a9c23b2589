//! Interface mode, fixed for the lifetime of a connection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which printer interface produced the stream.
///
/// Gates three decisions: whether byte 162 is a line separator, whether
/// byte 232 completes the line, and whether listings get line numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Legacy USB interface, no DTR assertion
    #[default]
    Legacy,
    /// DTR-handshake interface (TULIP4041)
    Dtr,
}

impl Mode {
    /// Map the "DTR enabled" setting to a mode.
    pub fn from_dtr(dtr: bool) -> Self {
        if dtr { Mode::Dtr } else { Mode::Legacy }
    }

    #[inline]
    pub fn is_dtr(self) -> bool {
        self == Mode::Dtr
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Legacy => f.write_str("legacy"),
            Mode::Dtr => f.write_str("dtr"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dtr() {
        assert_eq!(Mode::from_dtr(false), Mode::Legacy);
        assert_eq!(Mode::from_dtr(true), Mode::Dtr);
        assert!(Mode::Dtr.is_dtr());
        assert!(!Mode::default().is_dtr());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Mode::Dtr).unwrap(), "\"dtr\"");
        let mode: Mode = serde_json::from_str("\"legacy\"").unwrap();
        assert_eq!(mode, Mode::Legacy);
        assert_eq!(Mode::Dtr.to_string(), "dtr");
    }
}
