//! Structured node identifiers
//!
//! Slurm node names on the cluster follow a fixed convention: an alphabetic
//! prefix followed by a zero-padded numeric suffix (`node0042`). Parsing the
//! name once into its parts lets the range codec compare and format nodes
//! without slicing strings at fixed offsets.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Constant pattern; compiling it is exercised by the unit tests
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z]*)([0-9]+)$").expect("node identifier pattern is valid")
    })
}

/// A node name split into prefix, numeric value and zero-pad width
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeIdentifier {
    prefix: String,
    value: u64,
    width: usize,
}

impl NodeIdentifier {
    /// Build an identifier from its parts
    pub fn new(prefix: impl Into<String>, value: u64, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            value,
            width,
        }
    }

    /// Parse `prefix` + `digits`; returns `None` for names without a numeric
    /// suffix or with anything after the digits.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = identifier_pattern().captures(name)?;
        let digits = caps.get(2)?.as_str();
        let value = digits.parse::<u64>().ok()?;
        Some(Self {
            prefix: caps.get(1)?.as_str().to_string(),
            value,
            width: digits.len(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// The zero-padded numeric suffix (`"017"` for `node017`)
    pub fn digits(&self) -> String {
        format!("{:0width$}", self.value, width = self.width)
    }

    /// True when `next` directly follows `self` in the same prefix/width family
    pub fn precedes(&self, next: &NodeIdentifier) -> bool {
        self.prefix == next.prefix
            && self.width == next.width
            && self.value.checked_add(1) == Some(next.value)
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.digits())
    }
}

impl PartialOrd for NodeIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeIdentifier {
    /// Matches plain string ordering for identifiers of one prefix and width
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}
