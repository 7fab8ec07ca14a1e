//! Per-node hardware detail tables
//!
//! Two auxiliary tables are collected on the nodes themselves:
//!
//! - GPU detail: one `node,type,memory` row per physical GPU. Repeated rows
//!   for the same triple give the GPU count.
//! - CPU detail: lscpu-style `node,spec,value` rows, pivoted here into one
//!   [`CpuSpec`] per node keyed by upper-cased, underscored spec names
//!   (`Model name` becomes `MODEL_NAME`).

use crate::csv_input::DetailRow;
use std::collections::BTreeMap;

pub const SOCKETS: &str = "SOCKETS";
pub const CORES_PER_SOCKET: &str = "CORES_PER_SOCKET";
/// Raw lscpu spellings (`Socket(s)`, `Core(s) per socket`)
const SOCKETS_LSCPU: &str = "SOCKET(S)";
const CORES_PER_SOCKET_LSCPU: &str = "CORE(S)_PER_SOCKET";
pub const MODEL_NAME: &str = "MODEL_NAME";
pub const MISC_FEATURES: &str = "MISC_FEATURES";

/// GPUs of one type/memory installed in a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuAllocation {
    pub count: u32,
    pub gpu_type: String,
    pub memory: String,
}

/// GPU detail grouped by node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuDetailTable {
    by_node: BTreeMap<String, Vec<GpuAllocation>>,
}

impl GpuDetailTable {
    /// Count GPUs per (node, type, memory) triple
    pub fn from_rows(rows: &[DetailRow]) -> Self {
        let mut counts: BTreeMap<(&str, &str, &str), u32> = BTreeMap::new();
        for row in rows {
            *counts
                .entry((row.node.as_str(), row.key.as_str(), row.value.as_str()))
                .or_default() += 1;
        }

        let mut by_node: BTreeMap<String, Vec<GpuAllocation>> = BTreeMap::new();
        for ((node, gpu_type, memory), count) in counts {
            by_node
                .entry(node.to_string())
                .or_default()
                .push(GpuAllocation {
                    count,
                    gpu_type: gpu_type.to_string(),
                    memory: memory.to_string(),
                });
        }
        Self { by_node }
    }

    /// Allocations for one node, empty if the node has no detail rows
    pub fn get(&self, node: &str) -> &[GpuAllocation] {
        self.by_node.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Node names with detail rows, sorted
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.by_node.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

/// Upper-case a spec name and replace spaces with underscores
pub fn spec_column_name(spec: &str) -> String {
    spec.trim().to_uppercase().replace(' ', "_")
}

/// Pivoted CPU facts for one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuSpec {
    specs: BTreeMap<String, String>,
}

impl CpuSpec {
    /// Value of a pivoted column (`MODEL_NAME`, `SOCKETS`, ...)
    pub fn get(&self, column: &str) -> Option<&str> {
        self.specs.get(column).map(String::as_str)
    }

    fn get_any(&self, columns: &[&str]) -> Option<&str> {
        columns.iter().find_map(|c| self.get(c))
    }

    /// Insert a value; repeated values for one column are joined with a space
    pub fn insert(&mut self, spec: &str, value: &str) {
        self.specs
            .entry(spec_column_name(spec))
            .and_modify(|existing| {
                existing.push(' ');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    /// `"2 x 24"` from socket and per-socket core counts, or whichever is known
    pub fn cores_descriptor(&self) -> Option<String> {
        let sockets = self.get_any(&[SOCKETS, SOCKETS_LSCPU]);
        let cores = self.get_any(&[CORES_PER_SOCKET, CORES_PER_SOCKET_LSCPU]);
        match (sockets, cores) {
            (Some(sockets), Some(cores)) => Some(format!("{} x {}", sockets, cores)),
            (Some(sockets), None) => Some(sockets.to_string()),
            (None, Some(cores)) => Some(cores.to_string()),
            (None, None) => None,
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        self.get(MODEL_NAME)
    }

    pub fn misc_features(&self) -> Option<&str> {
        self.get(MISC_FEATURES)
    }
}

/// CPU detail pivoted to one row per node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuSpecTable {
    by_node: BTreeMap<String, CpuSpec>,
}

impl CpuSpecTable {
    /// Pivot long-form `node,spec,value` rows
    pub fn from_rows(rows: &[DetailRow]) -> Self {
        let mut by_node: BTreeMap<String, CpuSpec> = BTreeMap::new();
        for row in rows {
            by_node
                .entry(row.node.clone())
                .or_default()
                .insert(&row.key, &row.value);
        }
        Self { by_node }
    }

    pub fn get(&self, node: &str) -> Option<&CpuSpec> {
        self.by_node.get(node)
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(node: &str, key: &str, value: &str) -> DetailRow {
        DetailRow {
            node: node.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_gpu_rows_counted_per_triple() {
        let table = GpuDetailTable::from_rows(&[
            row("node010", "A100", "40GB"),
            row("node010", "A100", "40GB"),
        ]);
        assert_eq!(
            table.get("node010"),
            [GpuAllocation {
                count: 2,
                gpu_type: "A100".to_string(),
                memory: "40GB".to_string()
            }]
        );
    }

    #[test]
    fn test_gpu_mixed_types_kept_apart() {
        let table = GpuDetailTable::from_rows(&[
            row("node010", "A100", "40GB"),
            row("node010", "A100", "80GB"),
            row("node010", "A100", "80GB"),
            row("node011", "V100", "32GB"),
        ]);
        let allocations = table.get("node010");
        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].count, 1);
        assert_eq!(allocations[1].count, 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.nodes().collect::<Vec<_>>(), vec!["node010", "node011"]);
    }

    #[test]
    fn test_gpu_unknown_node_empty() {
        let table = GpuDetailTable::from_rows(&[]);
        assert!(table.get("node001").is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_spec_column_name() {
        assert_eq!(spec_column_name("Model name"), "MODEL_NAME");
        assert_eq!(spec_column_name("Core(s) per socket"), "CORE(S)_PER_SOCKET");
        assert_eq!(spec_column_name("Sockets"), "SOCKETS");
    }

    #[test]
    fn test_cpu_pivot() {
        let table = CpuSpecTable::from_rows(&[
            row("node001", "Sockets", "2"),
            row("node001", "Cores per socket", "24"),
            row("node001", "Model name", "Intel(R) Xeon(R) Gold 6248"),
            row("node002", "Sockets", "1"),
        ]);
        let spec = table.get("node001").unwrap();
        assert_eq!(spec.cores_descriptor().as_deref(), Some("2 x 24"));
        assert_eq!(spec.model_name(), Some("Intel(R) Xeon(R) Gold 6248"));
        assert_eq!(spec.misc_features(), None);
        assert_eq!(table.get("node002").unwrap().cores_descriptor().as_deref(), Some("1"));
        assert!(table.get("node003").is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_cpu_lscpu_spellings() {
        let table = CpuSpecTable::from_rows(&[
            row("node001", "Socket(s)", "2"),
            row("node001", "Core(s) per socket", "32"),
        ]);
        assert_eq!(
            table.get("node001").unwrap().cores_descriptor().as_deref(),
            Some("2 x 32")
        );
    }

    #[test]
    fn test_cpu_repeated_spec_joined() {
        let table = CpuSpecTable::from_rows(&[
            row("node001", "Misc features", "ib"),
            row("node001", "Misc features", "nvme"),
        ]);
        assert_eq!(table.get("node001").unwrap().misc_features(), Some("ib nvme"));
    }

    #[test]
    fn test_cores_descriptor_partial() {
        let mut spec = CpuSpec::default();
        assert_eq!(spec.cores_descriptor(), None);
        spec.insert("Cores per socket", "32");
        assert_eq!(spec.cores_descriptor().as_deref(), Some("32"));
    }
}
