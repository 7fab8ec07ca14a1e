//! Group signatures and table layouts
//!
//! A [`GroupSignature`] is the tuple of attributes that makes two nodes
//! interchangeable for a summary. A [`TableLayout`] pairs a signature with
//! the output columns and their header labels, so every summary table (CPU,
//! GPU, detailed CPU, public) is produced by the same summarizer.

use crate::inventory::NodeRecord;
use std::fmt;

/// One attribute a summary can group on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Partition,
    Cpus,
    Memory,
    Os,
    GpuCount,
    GpuType,
    GpuMemory,
    Cores,
    Model,
    MiscFeatures,
}

impl GroupKey {
    pub const ALL: [GroupKey; 10] = [
        GroupKey::Partition,
        GroupKey::Cpus,
        GroupKey::Memory,
        GroupKey::Os,
        GroupKey::GpuCount,
        GroupKey::GpuType,
        GroupKey::GpuMemory,
        GroupKey::Cores,
        GroupKey::Model,
        GroupKey::MiscFeatures,
    ];

    /// Machine-readable column name used in summary CSV headers
    pub fn column_name(self) -> &'static str {
        match self {
            GroupKey::Partition => "PARTITION",
            GroupKey::Cpus => "CPUS",
            GroupKey::Memory => "MEMORY",
            GroupKey::Os => "OS",
            GroupKey::GpuCount => "GPU_COUNT",
            GroupKey::GpuType => "GPU_TYPE",
            GroupKey::GpuMemory => "GPU_MEMORY",
            GroupKey::Cores => "CORES",
            GroupKey::Model => "MODEL_NAME",
            GroupKey::MiscFeatures => "MISC_FEATURES",
        }
    }

    /// The record's value for this key; missing (join-null) values are empty
    pub fn value(self, record: &NodeRecord) -> String {
        let inventory = record.inventory.as_ref();
        let gpu = record.gpu.as_ref();
        let cpu = record.cpu.as_ref();
        let value = match self {
            GroupKey::Partition => record.partition().map(str::to_string),
            GroupKey::Cpus => inventory.map(|f| f.cpus.clone()),
            GroupKey::Memory => inventory.map(|f| f.memory.clone()),
            GroupKey::Os => inventory.map(|f| f.os.clone()),
            GroupKey::GpuCount => gpu.map(|g| g.count.to_string()),
            GroupKey::GpuType => gpu.map(|g| g.gpu_type.clone()),
            GroupKey::GpuMemory => gpu.map(|g| g.memory.clone()),
            GroupKey::Cores => cpu.and_then(|c| c.cores_descriptor()),
            GroupKey::Model => cpu.and_then(|c| c.model_name()).map(str::to_string),
            GroupKey::MiscFeatures => cpu.and_then(|c| c.misc_features()).map(str::to_string),
        };
        value.unwrap_or_default()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Ordered set of keys defining equivalence classes of nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSignature {
    keys: Vec<GroupKey>,
}

impl GroupSignature {
    /// Build a signature; repeated keys are ignored
    pub fn new(keys: impl IntoIterator<Item = GroupKey>) -> Self {
        let mut unique = Vec::new();
        for key in keys {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        Self { keys: unique }
    }

    pub fn keys(&self) -> &[GroupKey] {
        &self.keys
    }

    pub fn position(&self, key: GroupKey) -> Option<usize> {
        self.keys.iter().position(|k| *k == key)
    }

    pub fn contains(&self, key: GroupKey) -> bool {
        self.position(key).is_some()
    }

    /// The record's values for every key, in signature order
    pub fn key_of(&self, record: &NodeRecord) -> Vec<String> {
        self.keys.iter().map(|k| k.value(record)).collect()
    }
}

/// One output column of a summary table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Key(GroupKey),
    NodeCount,
    NodeList,
}

/// Signature plus output columns and header labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    name: &'static str,
    signature: GroupSignature,
    columns: Vec<(Column, &'static str)>,
}

impl TableLayout {
    pub fn new(
        name: &'static str,
        signature: GroupSignature,
        columns: Vec<(Column, &'static str)>,
    ) -> Self {
        Self {
            name,
            signature,
            columns,
        }
    }

    fn machine(name: &'static str, keys: &[GroupKey], order: &[Column]) -> Self {
        let columns = order
            .iter()
            .map(|column| {
                let header = match column {
                    Column::Key(key) => key.column_name(),
                    Column::NodeCount => "NODE_COUNT",
                    Column::NodeList => "NODELIST",
                };
                (*column, header)
            })
            .collect();
        Self::new(name, GroupSignature::new(keys.iter().copied()), columns)
    }

    /// CPU-only nodes: `PARTITION,NODE_COUNT,CPUS,MEMORY,OS,NODELIST`
    pub fn cpu_summary() -> Self {
        use GroupKey::{Cpus, Memory, Os, Partition};
        Self::machine(
            "cpu",
            &[Partition, Os, Cpus, Memory],
            &[
                Column::Key(Partition),
                Column::NodeCount,
                Column::Key(Cpus),
                Column::Key(Memory),
                Column::Key(Os),
                Column::NodeList,
            ],
        )
    }

    /// GPU nodes, grouped additionally on GPU count, type and memory
    pub fn gpu_summary() -> Self {
        use GroupKey::{Cpus, GpuCount, GpuMemory, GpuType, Memory, Os, Partition};
        Self::machine(
            "gpu",
            &[Partition, Cpus, Memory, Os, GpuCount, GpuType, GpuMemory],
            &[
                Column::Key(Partition),
                Column::NodeCount,
                Column::Key(Cpus),
                Column::Key(Memory),
                Column::Key(GpuCount),
                Column::Key(GpuType),
                Column::Key(GpuMemory),
                Column::Key(Os),
                Column::NodeList,
            ],
        )
    }

    /// CPU-only nodes grouped on CPU hardware detail instead of CPU count/OS
    pub fn cpu_detailed() -> Self {
        use GroupKey::{Cores, Memory, MiscFeatures, Model, Partition};
        Self::machine(
            "cpu",
            &[Partition, Memory, Cores, Model, MiscFeatures],
            &[
                Column::Key(Partition),
                Column::NodeCount,
                Column::Key(Memory),
                Column::Key(Cores),
                Column::Key(Model),
                Column::Key(MiscFeatures),
                Column::NodeList,
            ],
        )
    }

    /// Public per-partition CPU table (partition is implied by the file)
    pub fn public_cpu() -> Self {
        use GroupKey::{Cores, Memory, MiscFeatures, Model, Partition};
        Self::new(
            "cpu",
            GroupSignature::new([Partition, Memory, Cores, Model, MiscFeatures]),
            vec![
                (Column::NodeCount, "Nodes"),
                (Column::Key(Cores), "Cores"),
                (Column::Key(Memory), "Memory"),
                (Column::Key(Model), "CPU model"),
                (Column::Key(MiscFeatures), "Misc. features"),
                (Column::NodeList, "Node list"),
            ],
        )
    }

    /// Public per-partition GPU table
    pub fn public_gpu() -> Self {
        use GroupKey::{Cores, GpuCount, GpuMemory, GpuType, Memory, MiscFeatures, Model, Partition};
        Self::new(
            "gpu",
            GroupSignature::new([
                Partition,
                Memory,
                Cores,
                Model,
                MiscFeatures,
                GpuCount,
                GpuType,
                GpuMemory,
            ]),
            vec![
                (Column::NodeCount, "Nodes"),
                (Column::Key(Cores), "Cores"),
                (Column::Key(Memory), "Memory"),
                (Column::Key(Model), "CPU model"),
                (Column::Key(MiscFeatures), "Misc. features"),
                (Column::Key(GpuCount), "GPUs"),
                (Column::Key(GpuType), "GPU type"),
                (Column::Key(GpuMemory), "GPU memory"),
                (Column::NodeList, "Node list"),
            ],
        )
    }

    /// Short table kind (`cpu` or `gpu`), used in file names
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> &GroupSignature {
        &self.signature
    }

    pub fn columns(&self) -> &[(Column, &'static str)] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(_, header)| *header).collect()
    }
}
