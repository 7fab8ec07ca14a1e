//! Public extraction of per-partition tables
//!
//! Reads back the CPU and GPU summaries, keeps only allow-listed partitions,
//! explodes every summary row to its nodes, attaches the pivoted CPU detail,
//! and regroups with the coarser public layouts. The result is one table per
//! partition and kind; empty combinations are skipped.

use crate::config::Config;
use crate::csv_output::CsvTable;
use crate::hardware::{CpuSpecTable, GpuAllocation};
use crate::inventory::{InventoryFields, NodeRecord};
use crate::join;
use crate::nodelist::{self, NodeListError};
use crate::signature::{GroupKey, TableLayout};
use crate::summarize;
use std::collections::HashSet;
use thiserror::Error;

const NODELIST: &str = "NODELIST";

/// Errors while reading summary tables back for publication
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("{table} summary has no '{column}' column")]
    MissingColumn { table: &'static str, column: String },

    #[error("{table} summary row {row}: bad node list: {source}")]
    NodeList {
        table: &'static str,
        row: usize,
        #[source]
        source: NodeListError,
    },

    #[error("{table} summary row {row}: GPU count '{value}' is not an integer")]
    GpuCount {
        table: &'static str,
        row: usize,
        value: String,
    },

    #[error("Failed to regroup {table} nodes: {source}")]
    Regroup {
        table: &'static str,
        #[source]
        source: NodeListError,
    },
}

/// Which summary a public table was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Cpu,
    Gpu,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Cpu => "cpu",
            TableKind::Gpu => "gpu",
        }
    }

    fn layout(self) -> TableLayout {
        match self {
            TableKind::Cpu => TableLayout::public_cpu(),
            TableKind::Gpu => TableLayout::public_gpu(),
        }
    }
}

/// One public table, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicTable {
    pub partition: String,
    pub kind: TableKind,
    pub table: CsvTable,
}

impl PublicTable {
    /// `{prefix}_{kind}_{partition}.csv`
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{}_{}_{}.csv", prefix, self.kind.as_str(), self.partition)
    }
}

/// Resolves summary columns once per table
struct SummaryColumns {
    partition: usize,
    memory: usize,
    nodelist: usize,
    os: Option<usize>,
    gpu: Option<[usize; 3]>,
}

impl SummaryColumns {
    fn resolve(table: &CsvTable, kind: TableKind) -> Result<Self, PublishError> {
        let name = kind.as_str();
        let require = |column: &str| {
            table
                .column_index(column)
                .ok_or_else(|| PublishError::MissingColumn {
                    table: name,
                    column: column.to_string(),
                })
        };
        let gpu = match kind {
            TableKind::Cpu => None,
            TableKind::Gpu => Some([
                require(GroupKey::GpuCount.column_name())?,
                require(GroupKey::GpuType.column_name())?,
                require(GroupKey::GpuMemory.column_name())?,
            ]),
        };
        Ok(Self {
            partition: require(GroupKey::Partition.column_name())?,
            memory: require(GroupKey::Memory.column_name())?,
            nodelist: require(NODELIST)?,
            os: table.column_index(GroupKey::Os.column_name()),
            gpu,
        })
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Expand allow-listed summary rows into per-node records
///
/// Node count and CPU count are not carried over; both are re-derived or
/// replaced by CPU detail downstream.
pub fn explode(
    summary: &CsvTable,
    kind: TableKind,
    public: &HashSet<&str>,
) -> Result<Vec<NodeRecord>, PublishError> {
    let columns = SummaryColumns::resolve(summary, kind)?;
    let table = kind.as_str();
    let mut records = Vec::new();

    for (index, row) in summary.rows().iter().enumerate() {
        let partition = cell(row, columns.partition);
        if !public.contains(partition) {
            continue;
        }

        let gpu = match columns.gpu {
            Some([count, gpu_type, memory]) => {
                let raw = cell(row, count);
                if raw.is_empty() {
                    None
                } else {
                    let count = raw.parse::<u32>().map_err(|_| PublishError::GpuCount {
                        table,
                        row: index + 1,
                        value: raw.to_string(),
                    })?;
                    Some(GpuAllocation {
                        count,
                        gpu_type: cell(row, gpu_type).to_string(),
                        memory: cell(row, memory).to_string(),
                    })
                }
            }
            None => None,
        };

        let fields = InventoryFields {
            partition: partition.to_string(),
            memory: cell(row, columns.memory).to_string(),
            os: columns.os.map(|i| cell(row, i)).unwrap_or("").to_string(),
            ..Default::default()
        };
        let nodes = nodelist::expand(cell(row, columns.nodelist)).map_err(|source| {
            PublishError::NodeList {
                table,
                row: index + 1,
                source,
            }
        })?;
        records.extend(nodes.into_iter().map(|node| NodeRecord {
            gpu: gpu.clone(),
            ..NodeRecord::new(node, fields.clone())
        }));
    }
    Ok(records)
}

/// Build every public table from the two summaries
///
/// Tables come out in allow-list order, CPU before GPU for each partition.
pub fn extract(
    cpu_summary: &CsvTable,
    gpu_summary: &CsvTable,
    cpu_specs: &CpuSpecTable,
    config: &Config,
) -> Result<Vec<PublicTable>, PublishError> {
    let partitions = config.public_partitions();
    let allowed: HashSet<&str> = partitions.iter().copied().collect();

    let mut grouped = Vec::with_capacity(2);
    for (kind, summary) in [(TableKind::Cpu, cpu_summary), (TableKind::Gpu, gpu_summary)] {
        let mut records = explode(summary, kind, &allowed)?;
        let missing = join::join_cpu(&mut records, cpu_specs);
        if missing > 0 {
            tracing::warn!(table = kind.as_str(), missing, "public nodes without CPU detail");
        }
        let summary = summarize::summarize(&records, &kind.layout()).map_err(|source| {
            PublishError::Regroup {
                table: kind.as_str(),
                source,
            }
        })?;
        grouped.push((kind, summary));
    }

    let mut tables = Vec::new();
    for partition in partitions {
        for (kind, summary) in &grouped {
            let table = summary.partition_table(partition);
            if table.is_empty() {
                tracing::debug!(partition, kind = kind.as_str(), "no public rows");
                continue;
            }
            tables.push(PublicTable {
                partition: partition.to_string(),
                kind: *kind,
                table,
            });
        }
    }
    Ok(tables)
}
