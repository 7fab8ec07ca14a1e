//! Raw inventory normalization
//!
//! The scheduler dump is irregular: rows carry a variable number of trailing
//! fields, and some rows pack several heterogeneous node ranges into a
//! bracket group (`node[017-018`, `045`, `109-111]`) spread across fields,
//! with no per-node CPU or memory fidelity. Normalization:
//!
//! 1. drops bracket-group rows and rows wider than the canonical header
//! 2. right-pads short rows with the null sentinel
//! 3. applies the [`RowFilter`]
//! 4. expands each row's node list into one [`NodeRecord`] per node
//!
//! Dropped rows are counted in [`NormalizeReport`] rather than discarded
//! silently. They are not repaired.

use crate::csv_input::RawInventory;
use crate::filter::{Exclusion, RowFilter};
use crate::hardware::{CpuSpec, GpuAllocation};
use crate::nodelist::{self, NodeListError};
use serde::Serialize;
use thiserror::Error;

pub const PARTITION: &str = "PARTITION";
pub const NODELIST: &str = "NODELIST";
pub const CPUS: &str = "CPUS";
pub const MEMORY: &str = "MEMORY";
pub const GRES: &str = "GRES";
pub const STATE: &str = "STATE";
pub const OS: &str = "OS";
pub const AVAIL_FEATURES: &str = "AVAIL_FEATURES";

/// Columns that must be present in the dump header
const REQUIRED_COLUMNS: [&str; 6] = [PARTITION, NODELIST, CPUS, MEMORY, GRES, STATE];

/// Trailing columns the dump prints without header labels
const TRAILING_COLUMNS: [&str; 2] = [OS, AVAIL_FEATURES];

/// How many malformed line numbers to keep for the report
const MALFORMED_SAMPLE_LIMIT: usize = 5;

/// Errors that make the inventory unusable
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Inventory header has no '{0}' column")]
    MissingColumn(String),

    #[error("Line {line}: bad node list '{node_list}': {source}")]
    NodeList {
        line: u64,
        node_list: String,
        #[source]
        source: NodeListError,
    },
}

/// Scheduler-reported attributes of one node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InventoryFields {
    pub partition: String,
    pub cpus: String,
    pub memory: String,
    pub gres: String,
    pub state: String,
    pub os: String,
    pub features: String,
}

/// One node with everything known about it
///
/// `inventory` is `None` only for nodes that appear in a hardware table but
/// not in the inventory (surfaced by the outer GPU join).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub node: String,
    pub inventory: Option<InventoryFields>,
    pub gpu: Option<GpuAllocation>,
    pub cpu: Option<CpuSpec>,
}

impl NodeRecord {
    pub fn new(node: impl Into<String>, inventory: InventoryFields) -> Self {
        Self {
            node: node.into(),
            inventory: Some(inventory),
            gpu: None,
            cpu: None,
        }
    }

    pub fn partition(&self) -> Option<&str> {
        self.inventory.as_ref().map(|f| f.partition.as_str())
    }
}

/// Counts of what normalization kept and dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub rows_read: usize,
    pub malformed_rows: usize,
    /// First few line numbers of malformed rows
    pub malformed_samples: Vec<u64>,
    pub excluded_partition_rows: usize,
    pub excluded_state_rows: usize,
    pub rows_kept: usize,
    pub nodes: usize,
}

impl NormalizeReport {
    fn record_malformed(&mut self, line: u64) {
        self.malformed_rows += 1;
        if self.malformed_samples.len() < MALFORMED_SAMPLE_LIMIT {
            self.malformed_samples.push(line);
        }
    }
}

/// Normalized inventory: fixed-shape rows expanded to per-node records
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub header: Vec<String>,
    pub records: Vec<NodeRecord>,
    pub report: NormalizeReport,
}

/// Column positions resolved from the dump header
#[derive(Debug, Clone)]
struct Schema {
    header: Vec<String>,
    partition: usize,
    nodelist: usize,
    cpus: usize,
    memory: usize,
    gres: usize,
    state: usize,
    os: usize,
    features: usize,
}

impl Schema {
    fn resolve(raw_header: &[String]) -> Result<Self, InventoryError> {
        let mut header: Vec<String> = raw_header.to_vec();
        for column in TRAILING_COLUMNS {
            if !header.iter().any(|h| h == column) {
                header.push(column.to_string());
            }
        }
        for column in REQUIRED_COLUMNS {
            if !header.iter().any(|h| h == column) {
                return Err(InventoryError::MissingColumn(column.to_string()));
            }
        }

        let index = |name: &str| header.iter().position(|h| h == name).unwrap_or_default();
        Ok(Self {
            partition: index(PARTITION),
            nodelist: index(NODELIST),
            cpus: index(CPUS),
            memory: index(MEMORY),
            gres: index(GRES),
            state: index(STATE),
            os: index(OS),
            features: index(AVAIL_FEATURES),
            header,
        })
    }

    fn width(&self) -> usize {
        self.header.len()
    }
}

/// True for fields carrying bracket-group syntax (`node[017-018`, `111]`)
pub fn is_bracket_group(field: &str) -> bool {
    field.contains(&['[', ']'][..])
}

/// Normalize a raw dump into per-node records
///
/// # Errors
///
/// Fails when the header lacks a required column or a kept row's node list
/// is not valid range notation.
pub fn normalize(
    raw: &RawInventory,
    filter: &RowFilter,
    null_sentinel: &str,
) -> Result<Inventory, InventoryError> {
    let schema = Schema::resolve(&raw.header)?;
    let mut report = NormalizeReport {
        rows_read: raw.rows.len(),
        ..Default::default()
    };
    let mut records = Vec::new();

    for row in &raw.rows {
        if row.fields.len() > schema.width() || row.fields.iter().any(|f| is_bracket_group(f)) {
            report.record_malformed(row.line);
            continue;
        }

        let mut fields = row.fields.clone();
        fields.resize(schema.width(), null_sentinel.to_string());

        let node_list = &fields[schema.nodelist];
        if node_list.is_empty() || node_list == null_sentinel {
            report.record_malformed(row.line);
            continue;
        }

        match filter.check(&fields[schema.partition], &fields[schema.state]) {
            Some(Exclusion::Partition) => {
                report.excluded_partition_rows += 1;
                continue;
            }
            Some(Exclusion::State) => {
                report.excluded_state_rows += 1;
                continue;
            }
            None => {}
        }

        let nodes = nodelist::expand(node_list).map_err(|source| InventoryError::NodeList {
            line: row.line,
            node_list: node_list.clone(),
            source,
        })?;

        let attributes = InventoryFields {
            partition: fields[schema.partition].clone(),
            cpus: fields[schema.cpus].clone(),
            memory: fields[schema.memory].clone(),
            gres: fields[schema.gres].clone(),
            state: fields[schema.state].clone(),
            os: fields[schema.os].clone(),
            features: fields[schema.features].clone(),
        };
        report.rows_kept += 1;
        report.nodes += nodes.len();
        records.extend(
            nodes
                .into_iter()
                .map(|node| NodeRecord::new(node, attributes.clone())),
        );
    }

    if report.malformed_rows > 0 {
        tracing::warn!(
            dropped = report.malformed_rows,
            sample_lines = ?report.malformed_samples,
            "dropped malformed inventory rows (bracket-group node lists or unexpected width)"
        );
    }
    tracing::debug!(
        rows = report.rows_read,
        kept = report.rows_kept,
        nodes = report.nodes,
        "normalized inventory"
    );

    Ok(Inventory {
        header: schema.header,
        records,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_input::RawRow;

    const NULL: &str = "(null)";

    fn raw(rows: &[&[&str]]) -> RawInventory {
        RawInventory {
            header: ["PARTITION", "NODELIST", "CPUS", "MEMORY", "GRES", "STATE"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, fields)| RawRow {
                    line: i as u64 + 2,
                    fields: fields.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn default_filter() -> RowFilter {
        RowFilter::none()
            .exclude_partition("sched_system_all")
            .exclude_state("drained*")
            .exclude_state("down*")
    }

    #[test]
    fn test_header_gets_trailing_columns() {
        let inventory = normalize(&raw(&[]), &RowFilter::none(), NULL).unwrap();
        assert_eq!(inventory.header.len(), 8);
        assert_eq!(inventory.header[6], "OS");
        assert_eq!(inventory.header[7], "AVAIL_FEATURES");
    }

    #[test]
    fn test_missing_required_column() {
        let mut input = raw(&[]);
        input.header.retain(|h| h != "GRES");
        assert!(matches!(
            normalize(&input, &RowFilter::none(), NULL),
            Err(InventoryError::MissingColumn(c)) if c == "GRES"
        ));
    }

    #[test]
    fn test_short_rows_padded_with_sentinel() {
        let inventory = normalize(
            &raw(&[&["part_a", "node001", "4", "8", "(null)", "idle"]]),
            &RowFilter::none(),
            NULL,
        )
        .unwrap();
        let fields = inventory.records[0].inventory.as_ref().unwrap();
        assert_eq!(fields.os, "(null)");
        assert_eq!(fields.features, "(null)");
        assert_eq!(fields.cpus, "4");
    }

    #[test]
    fn test_full_width_rows_kept() {
        let inventory = normalize(
            &raw(&[&["part_a", "node001", "4", "8", "(null)", "idle", "rocky8", "ib"]]),
            &RowFilter::none(),
            NULL,
        )
        .unwrap();
        let fields = inventory.records[0].inventory.as_ref().unwrap();
        assert_eq!(fields.os, "rocky8");
        assert_eq!(fields.features, "ib");
    }

    #[test]
    fn test_bracket_group_row_dropped() {
        let inventory = normalize(
            &raw(&[
                &["sched_bu_rebbi", "node[017-018", "045", "064", "109-111]", "1", "1", "(null)", "(null)"],
                &["part_a", "node001", "4", "8", "(null)", "idle"],
            ]),
            &RowFilter::none(),
            NULL,
        )
        .unwrap();
        assert_eq!(inventory.records.len(), 1);
        assert_eq!(inventory.records[0].node, "node001");
        assert_eq!(inventory.report.malformed_rows, 1);
        assert_eq!(inventory.report.malformed_samples, vec![2]);
    }

    #[test]
    fn test_closed_bracket_group_dropped() {
        let inventory = normalize(
            &raw(&[&["part_a", "node[001-002]", "4", "8", "(null)", "idle"]]),
            &RowFilter::none(),
            NULL,
        )
        .unwrap();
        assert!(inventory.records.is_empty());
        assert_eq!(inventory.report.malformed_rows, 1);
    }

    #[test]
    fn test_overwide_row_dropped() {
        let inventory = normalize(
            &raw(&[&["part_a", "node001", "4", "8", "(null)", "idle", "os", "f", "extra"]]),
            &RowFilter::none(),
            NULL,
        )
        .unwrap();
        assert!(inventory.records.is_empty());
        assert_eq!(inventory.report.malformed_rows, 1);
    }

    #[test]
    fn test_malformed_samples_capped() {
        let row: &[&str] = &["p", "node[1", "2]"];
        let bad = vec![row; 8];
        let inventory = normalize(&raw(&bad), &RowFilter::none(), NULL).unwrap();
        assert_eq!(inventory.report.malformed_rows, 8);
        assert_eq!(inventory.report.malformed_samples.len(), 5);
    }

    #[test]
    fn test_filters_applied_and_counted() {
        let inventory = normalize(
            &raw(&[
                &["sched_system_all", "node001", "4", "8", "(null)", "idle"],
                &["part_a", "node002", "4", "8", "(null)", "drained*"],
                &["part_a", "node003", "4", "8", "(null)", "down*"],
                &["part_a", "node004", "4", "8", "(null)", "drained"],
            ]),
            &default_filter(),
            NULL,
        )
        .unwrap();
        assert_eq!(inventory.report.excluded_partition_rows, 1);
        assert_eq!(inventory.report.excluded_state_rows, 2);
        assert_eq!(inventory.records.len(), 1);
        assert_eq!(inventory.records[0].node, "node004");
    }

    #[test]
    fn test_range_node_list_expanded() {
        let inventory = normalize(
            &raw(&[&["part_a", "node017-019", "4", "8", "(null)", "idle"]]),
            &RowFilter::none(),
            NULL,
        )
        .unwrap();
        let nodes: Vec<&str> = inventory.records.iter().map(|r| r.node.as_str()).collect();
        assert_eq!(nodes, vec!["node017", "node018", "node019"]);
        assert_eq!(inventory.report.rows_kept, 1);
        assert_eq!(inventory.report.nodes, 3);
    }

    #[test]
    fn test_bad_range_is_fatal() {
        let result = normalize(
            &raw(&[&["part_a", "node019-017", "4", "8", "(null)", "idle"]]),
            &RowFilter::none(),
            NULL,
        );
        assert!(matches!(result, Err(InventoryError::NodeList { line: 2, .. })));
    }

    #[test]
    fn test_null_node_list_counted_as_malformed() {
        let inventory = normalize(
            &raw(&[&["part_a", "(null)", "4", "8", "(null)", "idle"]]),
            &RowFilter::none(),
            NULL,
        )
        .unwrap();
        assert!(inventory.records.is_empty());
        assert_eq!(inventory.report.malformed_rows, 1);
    }

    #[test]
    fn test_header_order_is_respected() {
        let mut input = raw(&[&["node001", "part_a", "4", "8", "(null)", "idle"]]);
        input.header.swap(0, 1);
        let inventory = normalize(&input, &RowFilter::none(), NULL).unwrap();
        assert_eq!(inventory.records[0].node, "node001");
        assert_eq!(inventory.records[0].partition(), Some("part_a"));
    }
}
