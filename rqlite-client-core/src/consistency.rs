//! Read consistency levels.

use std::fmt;

/// `strong` (linearizable through leader), `weak` (leader-served without a
/// full consensus round) or `none` (any node within a freshness window).
/// Writes always use `Strong`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Consistency {
    Strong,
    Weak,
    None,
}

impl Consistency {
    /// The query-string value used by `/db/query?level=...`.
    pub fn as_query_value(self) -> &'static str {
        match self {
            Consistency::Strong => "strong",
            Consistency::Weak => "weak",
            Consistency::None => "none",
        }
    }

    /// Whether this level requires a leader to be located before issuing
    /// the real request.
    pub fn requires_leader_discovery(self) -> bool {
        !matches!(self, Consistency::None)
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

impl Default for Consistency {
    /// Default read consistency is `weak`.
    fn default() -> Self {
        Consistency::Weak
    }
}

/// A duration string such as `"5m"`, passed through to the server
/// unparsed. The client never interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freshness(pub String);

impl Freshness {
    /// Default freshness window.
    pub fn default_value() -> Self {
        Freshness("5m".to_string())
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for Freshness {
    fn default() -> Self {
        Self::default_value()
    }
}
