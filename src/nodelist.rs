//! Node-range codec
//!
//! Converts between the compressed node-list notation used in the summary
//! tables and explicit lists of node names.
//!
//! # Notation
//!
//! ```text
//! node001-003;node006;node1601-1602
//! ```
//!
//! Entries are separated by `;`. An entry is either a single node name or a
//! run `prefix + startdigits - enddigits`, where the end carries no prefix and
//! every node in the run is padded to the width of `startdigits`.
//!
//! # Algorithm
//!
//! `compress` sorts the names as plain strings (zero padding makes that equal
//! to numeric order within one prefix and width), then scans left to right and
//! extends the open run of the name's prefix/width family while the name is
//! the numeric successor of that run's end. Runs never cross a change of
//! prefix or width.
//!
//! # Example
//!
//! ```
//! use nodeinv::nodelist::{compress, expand};
//!
//! # fn main() -> anyhow::Result<()> {
//! let nodes = expand("node017-018;node045")?;
//! assert_eq!(nodes, vec!["node017", "node018", "node045"]);
//! assert_eq!(compress(&nodes)?, "node017-018;node045");
//! # Ok(())
//! # }
//! ```

use crate::node_id::NodeIdentifier;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Separator between entries of a compressed node list
pub const ENTRY_SEPARATOR: char = ';';

/// Separator between the start and end of a run
pub const RUN_SEPARATOR: char = '-';

/// Upper bound on nodes produced by a single run
pub const MAX_RUN_NODES: u64 = 1 << 20;

/// Errors raised by the range codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeListError {
    #[error("Malformed node range '{token}': {reason}")]
    MalformedRange { token: String, reason: String },

    #[error("Node range '{token}' runs backwards ({start} > {end})")]
    DescendingRange { token: String, start: u64, end: u64 },

    #[error("Node name '{name}' cannot appear in a node list")]
    InvalidNodeName { name: String },
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, NodeListError>;

fn malformed(token: &str, reason: &str) -> NodeListError {
    NodeListError::MalformedRange {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a compressed node list into individual node names
///
/// Entries without a `-` are passed through verbatim; empty entries are
/// skipped, so `expand("")` is empty.
///
/// # Errors
///
/// Returns [`NodeListError`] when a run has more than one `-`, a start without
/// digits, a non-numeric end, or a start greater than its end. The whole call
/// fails; no partial expansion is returned.
pub fn expand(node_list: &str) -> Result<Vec<String>> {
    let mut nodes = Vec::new();

    for token in node_list.split(ENTRY_SEPARATOR) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if !token.contains(RUN_SEPARATOR) {
            nodes.push(token.to_string());
            continue;
        }
        expand_run(token, &mut nodes)?;
    }

    Ok(nodes)
}

fn expand_run(token: &str, out: &mut Vec<String>) -> Result<()> {
    let mut parts = token.split(RUN_SEPARATOR);
    let (left, right) = match (parts.next(), parts.next(), parts.next()) {
        (Some(left), Some(right), None) => (left, right),
        _ => return Err(malformed(token, "expected exactly one '-'")),
    };

    let prefix: String = left
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let start_digits: String = left.chars().filter(|c| c.is_ascii_digit()).collect();
    if start_digits.is_empty() {
        return Err(malformed(token, "run start has no digits"));
    }
    if right.is_empty() || !right.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed(token, "run end must be digits only"));
    }

    let width = start_digits.len();
    let start: u64 = start_digits
        .parse()
        .map_err(|_| malformed(token, "run start out of range"))?;
    let end: u64 = right
        .parse()
        .map_err(|_| malformed(token, "run end out of range"))?;

    if start > end {
        return Err(NodeListError::DescendingRange {
            token: token.to_string(),
            start,
            end,
        });
    }
    if end - start >= MAX_RUN_NODES {
        return Err(malformed(token, "run is longer than the node limit"));
    }

    out.extend(
        (start..=end).map(|value| NodeIdentifier::new(prefix.as_str(), value, width).to_string()),
    );
    Ok(())
}

/// A maximal run of contiguous nodes
#[derive(Debug, Clone, PartialEq, Eq)]
enum Run {
    /// Name without a numeric suffix, kept verbatim
    Opaque(String),
    Span {
        first: NodeIdentifier,
        last: NodeIdentifier,
    },
}

impl Run {
    fn render(&self) -> String {
        match self {
            Run::Opaque(name) => name.clone(),
            Run::Span { first, last } if first == last => first.to_string(),
            Run::Span { first, last } => format!("{}{}{}", first, RUN_SEPARATOR, last.digits()),
        }
    }
}

/// Compress node names into the canonical `;`-separated run notation
///
/// Duplicates collapse, entries appear in ascending order of their first
/// name, and a single name compresses to itself. Runs are maximal within one
/// prefix and width; names of other families sorting in between do not break
/// them. Names with different prefixes are never coalesced.
///
/// # Errors
///
/// Returns [`NodeListError::InvalidNodeName`] for empty names or names
/// containing `;` or `-`, which the notation cannot represent.
pub fn compress<S: AsRef<str>>(nodes: &[S]) -> Result<String> {
    let mut names = BTreeSet::new();
    for node in nodes {
        let name = node.as_ref().trim();
        if name.is_empty() || name.contains(ENTRY_SEPARATOR) || name.contains(RUN_SEPARATOR) {
            return Err(NodeListError::InvalidNodeName {
                name: node.as_ref().to_string(),
            });
        }
        names.insert(name);
    }

    // Index of the newest run per (prefix, width) family, so names from other
    // families sorting in between never split a run
    let mut open: BTreeMap<(String, usize), usize> = BTreeMap::new();
    let mut runs: Vec<Run> = Vec::new();
    for name in names {
        let Some(id) = NodeIdentifier::parse(name) else {
            runs.push(Run::Opaque(name.to_string()));
            continue;
        };
        let family = (id.prefix().to_string(), id.width());
        if let Some(&index) = open.get(&family) {
            if let Run::Span { last, .. } = &mut runs[index] {
                if last.precedes(&id) {
                    *last = id;
                    continue;
                }
            }
        }
        open.insert(family, runs.len());
        runs.push(Run::Span {
            first: id.clone(),
            last: id,
        });
    }

    Ok(runs
        .iter()
        .map(Run::render)
        .collect::<Vec<_>>()
        .join(&ENTRY_SEPARATOR.to_string()))
}

/// Re-compress an already compressed node list (canonicalizes order and runs)
pub fn normalize(node_list: &str) -> Result<String> {
    compress(&expand(node_list)?)
}
