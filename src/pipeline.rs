//! Stage orchestration
//!
//! Every stage takes explicit paths. Required inputs are checked before any
//! stage runs, every output table is computed in memory, and only then are
//! files written. Every table is staged in a temp file first and the renames
//! happen only once all of them are on disk, so a failed run leaves no
//! half-written file and, short of a failing rename, no new files at all.

use crate::config::Config;
use crate::csv_input;
use crate::csv_output::CsvTable;
use crate::filter::RowFilter;
use crate::hardware::{CpuSpecTable, GpuDetailTable};
use crate::inventory::{self, NormalizeReport};
use crate::join::{self, JoinReport};
use crate::publish::{self, PublicTable};
use crate::signature::TableLayout;
use crate::summarize;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const CPU_SUMMARY_FILE: &str = "cpu_node_summary.csv";
pub const GPU_SUMMARY_FILE: &str = "gpu_node_summary.csv";

/// Inputs of the summarize stage
#[derive(Debug, Clone)]
pub struct SummarizeInputs {
    pub inventory: PathBuf,
    pub gpu_info: PathBuf,
    pub cpu_info: Option<PathBuf>,
    /// Group CPU nodes on CPU detail instead of CPU count and OS
    pub detailed: bool,
}

/// What a run read, dropped and wrote
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize: Option<NormalizeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinReport>,
    pub cpu_groups: usize,
    pub gpu_groups: usize,
    pub public_tables: usize,
    pub files_written: Vec<PathBuf>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(normalize) = &self.normalize {
            writeln!(
                f,
                "inventory: {} rows read, {} kept, {} nodes",
                normalize.rows_read, normalize.rows_kept, normalize.nodes
            )?;
            writeln!(
                f,
                "excluded: {} by partition, {} by state",
                normalize.excluded_partition_rows, normalize.excluded_state_rows
            )?;
            if normalize.malformed_rows > 0 {
                writeln!(
                    f,
                    "malformed rows dropped: {} (lines {:?})",
                    normalize.malformed_rows, normalize.malformed_samples
                )?;
            }
        }
        if let Some(join) = &self.join {
            writeln!(
                f,
                "join mismatches: {} GPU nodes without detail, {} detail nodes without inventory, {} nodes without CPU detail",
                join.gpu_nodes_without_detail,
                join.detail_nodes_without_inventory,
                join.nodes_without_cpu_detail
            )?;
        }
        if self.cpu_groups + self.gpu_groups > 0 {
            writeln!(f, "summary groups: {} cpu, {} gpu", self.cpu_groups, self.gpu_groups)?;
        }
        if self.public_tables > 0 {
            writeln!(f, "public tables: {}", self.public_tables)?;
        }
        for path in &self.files_written {
            writeln!(f, "wrote {}", path.display())?;
        }
        Ok(())
    }
}

/// Summary tables computed in memory
#[derive(Debug, Clone)]
pub struct Summaries {
    pub cpu: CsvTable,
    pub gpu: CsvTable,
}

fn check_summarize_inputs(inputs: &SummarizeInputs) -> Result<()> {
    csv_input::require_file("summarize", &inputs.inventory)?;
    csv_input::require_file("summarize", &inputs.gpu_info)?;
    if let Some(cpu_info) = &inputs.cpu_info {
        csv_input::require_file("summarize", cpu_info)?;
    }
    if inputs.detailed && inputs.cpu_info.is_none() {
        anyhow::bail!("summarize: detailed CPU grouping needs CPU detail (--cpu-info)");
    }
    Ok(())
}

fn read_cpu_specs(path: &Path) -> Result<CpuSpecTable> {
    let rows = csv_input::read_detail_rows(path)
        .with_context(|| format!("Failed to read CPU detail {}", path.display()))?;
    let specs = CpuSpecTable::from_rows(&rows);
    tracing::debug!(nodes = specs.len(), "pivoted CPU detail");
    Ok(specs)
}

/// Normalize, join and summarize without writing anything
pub fn build_summaries(
    inputs: &SummarizeInputs,
    config: &Config,
    report: &mut RunReport,
) -> Result<Summaries> {
    let raw = csv_input::read_inventory(&inputs.inventory)
        .with_context(|| format!("Failed to read inventory {}", inputs.inventory.display()))?;
    let filter = RowFilter::from_config(&config.inventory);
    let normalized = inventory::normalize(&raw, &filter, &config.null_sentinel)
        .with_context(|| format!("Failed to normalize {}", inputs.inventory.display()))?;

    let gpu_rows = csv_input::read_detail_rows(&inputs.gpu_info)
        .with_context(|| format!("Failed to read GPU detail {}", inputs.gpu_info.display()))?;
    let gpu_detail = GpuDetailTable::from_rows(&gpu_rows);
    let cpu_specs = inputs.cpu_info.as_deref().map(read_cpu_specs).transpose()?;

    let joined = join::join(
        normalized.records,
        &gpu_detail,
        cpu_specs.as_ref(),
        &config.null_sentinel,
    );

    let cpu_layout = if inputs.detailed {
        TableLayout::cpu_detailed()
    } else {
        TableLayout::cpu_summary()
    };
    let cpu = summarize::summarize(&joined.cpu, &cpu_layout).context("Failed to summarize CPU nodes")?;
    let gpu = summarize::summarize(&joined.gpu, &TableLayout::gpu_summary())
        .context("Failed to summarize GPU nodes")?;

    report.normalize = Some(normalized.report);
    report.join = Some(joined.report);
    report.cpu_groups = cpu.rows().len();
    report.gpu_groups = gpu.rows().len();
    Ok(Summaries {
        cpu: cpu.to_table(),
        gpu: gpu.to_table(),
    })
}

fn write_tables(out_dir: &Path, tables: &[(String, &CsvTable)], report: &mut RunReport) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    let staged = tables
        .iter()
        .map(|(file_name, table)| table.stage(&out_dir.join(file_name)))
        .collect::<Result<Vec<_>>>()?;
    for table in staged {
        report.files_written.push(table.commit()?);
    }
    Ok(())
}

fn public_files<'a>(tables: &'a [PublicTable], config: &Config) -> Vec<(String, &'a CsvTable)> {
    tables
        .iter()
        .map(|t| (t.file_name(&config.publish.file_prefix), &t.table))
        .collect()
}

/// Write `cpu_node_summary.csv` and `gpu_node_summary.csv`
pub fn summarize(inputs: &SummarizeInputs, out_dir: &Path, config: &Config) -> Result<RunReport> {
    check_summarize_inputs(inputs)?;
    let mut report = RunReport::default();
    let summaries = build_summaries(inputs, config, &mut report)?;
    write_tables(
        out_dir,
        &[
            (CPU_SUMMARY_FILE.to_string(), &summaries.cpu),
            (GPU_SUMMARY_FILE.to_string(), &summaries.gpu),
        ],
        &mut report,
    )?;
    Ok(report)
}

/// Write public tables from summaries previously written to `summary_dir`
pub fn publish(
    summary_dir: &Path,
    cpu_info: &Path,
    out_dir: &Path,
    config: &Config,
) -> Result<RunReport> {
    let cpu_path = summary_dir.join(CPU_SUMMARY_FILE);
    let gpu_path = summary_dir.join(GPU_SUMMARY_FILE);
    for path in [&cpu_path, &gpu_path] {
        csv_input::require_file("publish", path)?;
    }
    csv_input::require_file("publish", cpu_info)?;

    let cpu = csv_input::read_table(&cpu_path)
        .with_context(|| format!("Failed to read CPU summary {}", cpu_path.display()))?;
    let gpu = csv_input::read_table(&gpu_path)
        .with_context(|| format!("Failed to read GPU summary {}", gpu_path.display()))?;
    let specs = read_cpu_specs(cpu_info)?;
    let tables = publish::extract(&cpu, &gpu, &specs, config).context("publish")?;

    let mut report = RunReport {
        public_tables: tables.len(),
        ..Default::default()
    };
    write_tables(out_dir, &public_files(&tables, config), &mut report)?;
    Ok(report)
}

/// Summarize and publish in one pass; summaries and public tables land in `out_dir`
pub fn run(inputs: &SummarizeInputs, out_dir: &Path, config: &Config) -> Result<RunReport> {
    let cpu_info = inputs
        .cpu_info
        .as_deref()
        .context("run: CPU detail (--cpu-info) is required for public tables")?;
    check_summarize_inputs(inputs)?;

    let mut report = RunReport::default();
    let summaries = build_summaries(inputs, config, &mut report)?;
    let specs = read_cpu_specs(cpu_info)?;
    let tables = publish::extract(&summaries.cpu, &summaries.gpu, &specs, config).context("publish")?;
    report.public_tables = tables.len();

    let mut files = vec![
        (CPU_SUMMARY_FILE.to_string(), &summaries.cpu),
        (GPU_SUMMARY_FILE.to_string(), &summaries.gpu),
    ];
    files.extend(public_files(&tables, config));
    write_tables(out_dir, &files, &mut report)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const INVENTORY: &str = "PARTITION,NODELIST,CPUS,MEMORY,GRES,STATE\n\
        mit_normal,node001,96,385000,(null),idle,rocky8\n\
        mit_normal,node002,96,385000,(null),idle,rocky8\n\
        mit_normal_gpu,node010,64,1000000,gpu:h100:4,mixed,rocky8\n\
        sched_bu_rebbi,node[017-018,045,109-111],1,1,(null),(null)\n\
        mit_data_transfer,node900,16,64000,(null),idle,rocky8\n";

    const GPU_INFO: &str = "node010,H100,80GB\nnode010,H100,80GB\nnode010,H100,80GB\nnode010,H100,80GB\n";

    const CPU_INFO: &str = "node001,Sockets,2\nnode001,Cores per socket,48\nnode001,Model name,EPYC 9474F\n\
        node002,Sockets,2\nnode002,Cores per socket,48\nnode002,Model name,EPYC 9474F\n\
        node010,Sockets,2\nnode010,Cores per socket,32\nnode010,Model name,EPYC 9354\n";

    fn inputs(dir: &TempDir) -> SummarizeInputs {
        let write = |name: &str, content: &str| {
            let path = dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        };
        SummarizeInputs {
            inventory: write("all_nodes.csv", INVENTORY),
            gpu_info: write("gpu_info.csv", GPU_INFO),
            cpu_info: Some(write("cpu_info.csv", CPU_INFO)),
            detailed: false,
        }
    }

    #[test]
    fn test_summarize_writes_both_tables() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let report = summarize(&inputs(&dir), &out, &Config::embedded().unwrap()).unwrap();

        let cpu = fs::read_to_string(out.join(CPU_SUMMARY_FILE)).unwrap();
        assert!(cpu.contains("mit_normal,2,96,385000,rocky8,node001-002"));
        let gpu = fs::read_to_string(out.join(GPU_SUMMARY_FILE)).unwrap();
        assert!(gpu.contains("mit_normal_gpu,1,64,1000000,4,H100,80GB,rocky8,node010"));

        let normalize = report.normalize.unwrap();
        assert_eq!(normalize.malformed_rows, 1);
        assert_eq!(report.files_written.len(), 2);
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let mut bad = inputs(&dir);
        bad.gpu_info = dir.path().join("missing.csv");
        let err = summarize(&bad, &out, &Config::embedded().unwrap()).unwrap_err();
        assert!(err.to_string().contains("missing.csv"));
        assert!(!out.exists());
    }

    #[test]
    fn test_run_publishes_allow_listed_partitions() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let config = Config::embedded().unwrap();
        let report = run(&inputs(&dir), &out, &config).unwrap();

        assert_eq!(report.public_tables, 2);
        assert!(out.join("node_info_cpu_mit_normal.csv").exists());
        assert!(out.join("node_info_gpu_mit_normal_gpu.csv").exists());
        assert!(!out.join("node_info_cpu_mit_data_transfer.csv").exists());

        let public = fs::read_to_string(out.join("node_info_cpu_mit_normal.csv")).unwrap();
        assert_eq!(
            public,
            "Nodes,Cores,Memory,CPU model,Misc. features,Node list\n\
             2,2 x 48,385000,EPYC 9474F,,node001-002\n"
        );
    }

    #[test]
    fn test_publish_reads_written_summaries() {
        let dir = TempDir::new().unwrap();
        let config = Config::embedded().unwrap();
        let inputs = inputs(&dir);
        let summary_dir = dir.path().join("summary");
        summarize(&inputs, &summary_dir, &config).unwrap();

        let public_dir = dir.path().join("public");
        let report = publish(
            &summary_dir,
            inputs.cpu_info.as_deref().unwrap(),
            &public_dir,
            &config,
        )
        .unwrap();
        assert_eq!(report.files_written.len(), 2);
        let gpu = fs::read_to_string(public_dir.join("node_info_gpu_mit_normal_gpu.csv")).unwrap();
        assert!(gpu.contains("1,2 x 32,1000000,EPYC 9354,,4,H100,80GB,node010"));
    }

    #[test]
    fn test_detailed_requires_cpu_info() {
        let dir = TempDir::new().unwrap();
        let mut detailed = inputs(&dir);
        detailed.detailed = true;
        detailed.cpu_info = None;
        assert!(summarize(&detailed, dir.path(), &Config::embedded().unwrap()).is_err());
    }

    #[test]
    fn test_report_text() {
        let report = RunReport {
            files_written: vec![PathBuf::from("out/cpu_node_summary.csv")],
            ..Default::default()
        };
        assert_eq!(report.to_string(), "wrote out/cpu_node_summary.csv\n");
    }

    #[test]
    fn test_failed_staging_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut first = CsvTable::new(["PARTITION"]);
        first.add_row(vec!["mit_normal".to_string()]);
        let second = CsvTable::new(["PARTITION"]);
        let mut report = RunReport::default();

        let result = write_tables(
            dir.path(),
            &[
                ("a.csv".to_string(), &first),
                ("no_such_dir/b.csv".to_string(), &second),
            ],
            &mut report,
        );
        assert!(result.is_err());
        assert!(report.files_written.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
