//! Partition summarizer
//!
//! Groups node records by a [`TableLayout`]'s signature, unions each group's
//! node names and compresses them with the range codec. Every record lands in
//! exactly one group, and groups are emitted in a deterministic order:
//! partition name case-insensitively, then the full signature.

use crate::csv_output::CsvTable;
use crate::inventory::NodeRecord;
use crate::nodelist::{self, NodeListError};
use crate::signature::{Column, GroupKey, TableLayout};
use std::collections::{BTreeMap, BTreeSet};

/// One group of interchangeable nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    /// Signature values, in signature order
    pub key: Vec<String>,
    pub nodes: BTreeSet<String>,
    /// Compressed form of `nodes`
    pub node_list: String,
}

impl SummaryRow {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Grouped rows for one layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    layout: TableLayout,
    rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total nodes across all groups
    pub fn total_nodes(&self) -> usize {
        self.rows.iter().map(SummaryRow::node_count).sum()
    }

    /// Value of `key` in `row`, empty if the signature lacks it
    pub fn value<'a>(&self, row: &'a SummaryRow, key: GroupKey) -> &'a str {
        self.layout
            .signature()
            .position(key)
            .and_then(|i| row.key.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn render(&self, row: &SummaryRow) -> Vec<String> {
        self.layout
            .columns()
            .iter()
            .map(|(column, _)| match column {
                Column::Key(key) => self.value(row, *key).to_string(),
                Column::NodeCount => row.node_count().to_string(),
                Column::NodeList => row.node_list.clone(),
            })
            .collect()
    }

    /// Render every row with the layout's header
    pub fn to_table(&self) -> CsvTable {
        let mut table = CsvTable::new(self.layout.headers());
        for row in &self.rows {
            table.add_row(self.render(row));
        }
        table
    }

    /// Render only the rows of one partition
    pub fn partition_table(&self, partition: &str) -> CsvTable {
        let mut table = CsvTable::new(self.layout.headers());
        for row in self
            .rows
            .iter()
            .filter(|row| self.value(row, GroupKey::Partition) == partition)
        {
            table.add_row(self.render(row));
        }
        table
    }
}

/// Group `records` by the layout's signature and compress each node set
///
/// # Errors
///
/// Fails if a node name cannot be written in range notation; no partial
/// summary is returned.
pub fn summarize(records: &[NodeRecord], layout: &TableLayout) -> Result<Summary, NodeListError> {
    let signature = layout.signature();
    let mut groups: BTreeMap<Vec<String>, BTreeSet<String>> = BTreeMap::new();
    for record in records {
        groups
            .entry(signature.key_of(record))
            .or_default()
            .insert(record.node.clone());
    }

    let mut rows = groups
        .into_iter()
        .map(|(key, nodes)| {
            let node_list = nodelist::compress(&nodes.iter().collect::<Vec<_>>())?;
            Ok(SummaryRow {
                key,
                nodes,
                node_list,
            })
        })
        .collect::<Result<Vec<_>, NodeListError>>()?;

    let partition = signature.position(GroupKey::Partition);
    rows.sort_by_cached_key(|row| {
        partition
            .and_then(|i| row.key.get(i))
            .map(|p| p.to_lowercase())
            .unwrap_or_default()
    });

    tracing::debug!(
        table = layout.name(),
        groups = rows.len(),
        records = records.len(),
        "summarized"
    );
    Ok(Summary {
        layout: layout.clone(),
        rows,
    })
}
