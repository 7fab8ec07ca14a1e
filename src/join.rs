//! Joining node records with hardware detail
//!
//! - CPU-only nodes are those whose GRES field is the null sentinel; every
//!   other node is a GPU node.
//! - GPU nodes are full-outer-joined with the GPU detail table. Mismatches in
//!   either direction are kept with empty fields so they stay visible in the
//!   output.
//! - When CPU detail is available, every record is left-joined with it.
//!
//! Keys are exact node name strings.

use crate::hardware::{CpuSpecTable, GpuDetailTable};
use crate::inventory::NodeRecord;
use serde::Serialize;
use std::collections::BTreeSet;

/// Join mismatches, reported but never fatal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    /// GPU nodes in the inventory with no GPU detail rows
    pub gpu_nodes_without_detail: usize,
    /// Nodes with GPU detail rows but no GPU inventory row
    pub detail_nodes_without_inventory: usize,
    /// Records with no CPU detail (only counted when CPU detail was given)
    pub nodes_without_cpu_detail: usize,
}

/// Inventory split into the CPU and GPU sets, joined with hardware detail
#[derive(Debug, Clone, Default)]
pub struct JoinedInventory {
    pub cpu: Vec<NodeRecord>,
    pub gpu: Vec<NodeRecord>,
    pub report: JoinReport,
}

/// Split records on the GRES field
pub fn split_by_gres(
    records: Vec<NodeRecord>,
    null_sentinel: &str,
) -> (Vec<NodeRecord>, Vec<NodeRecord>) {
    records.into_iter().partition(|record| {
        record
            .inventory
            .as_ref()
            .map_or(true, |fields| fields.gres == null_sentinel)
    })
}

/// Full outer join of GPU node records with GPU detail
///
/// A node with several GPU type/memory triples yields one record per triple.
pub fn join_gpu(
    records: Vec<NodeRecord>,
    detail: &GpuDetailTable,
    report: &mut JoinReport,
) -> Vec<NodeRecord> {
    let inventory_nodes: BTreeSet<String> = records.iter().map(|r| r.node.clone()).collect();
    let mut joined = Vec::with_capacity(records.len());

    for record in records {
        let allocations = detail.get(&record.node);
        if allocations.is_empty() {
            report.gpu_nodes_without_detail += 1;
            tracing::warn!(node = %record.node, "GPU node has no GPU detail rows");
            joined.push(record);
            continue;
        }
        joined.extend(allocations.iter().map(|allocation| NodeRecord {
            gpu: Some(allocation.clone()),
            ..record.clone()
        }));
    }

    for node in detail.nodes().filter(|n| !inventory_nodes.contains(*n)) {
        report.detail_nodes_without_inventory += 1;
        tracing::warn!(node = %node, "GPU detail rows for a node missing from the GPU inventory");
        joined.extend(detail.get(node).iter().map(|allocation| NodeRecord {
            node: node.to_string(),
            inventory: None,
            gpu: Some(allocation.clone()),
            cpu: None,
        }));
    }

    joined
}

/// Left join of records with pivoted CPU detail; returns the number of misses
pub fn join_cpu(records: &mut [NodeRecord], specs: &CpuSpecTable) -> usize {
    let mut missing = 0;
    for record in records.iter_mut() {
        match specs.get(&record.node) {
            Some(spec) => record.cpu = Some(spec.clone()),
            None => {
                missing += 1;
                tracing::debug!(node = %record.node, "no CPU detail for node");
            }
        }
    }
    missing
}

/// Split, then join both sets with the available hardware detail
pub fn join(
    records: Vec<NodeRecord>,
    gpu_detail: &GpuDetailTable,
    cpu_specs: Option<&CpuSpecTable>,
    null_sentinel: &str,
) -> JoinedInventory {
    let mut report = JoinReport::default();
    let (mut cpu, gpu) = split_by_gres(records, null_sentinel);
    let mut gpu = join_gpu(gpu, gpu_detail, &mut report);

    if let Some(specs) = cpu_specs {
        report.nodes_without_cpu_detail = join_cpu(&mut cpu, specs) + join_cpu(&mut gpu, specs);
        if report.nodes_without_cpu_detail > 0 {
            tracing::warn!(
                missing = report.nodes_without_cpu_detail,
                "nodes without CPU detail rows"
            );
        }
    }

    tracing::debug!(cpu = cpu.len(), gpu = gpu.len(), "joined hardware detail");
    JoinedInventory { cpu, gpu, report }
}
