//! CLI argument parsing for nodeinv

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "nodeinv")]
#[command(version)]
#[command(about = "Summarize Slurm node inventory into partition hardware tables", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    /// Configuration file (TOML); the embedded defaults are used otherwise
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Report format (text or json)
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the CPU and GPU node summary tables
    Summarize {
        /// Raw inventory dump (header + ragged rows)
        #[arg(long, value_name = "FILE")]
        inventory: PathBuf,

        /// GPU detail: headerless node,type,memory rows
        #[arg(long = "gpu-info", value_name = "FILE")]
        gpu_info: PathBuf,

        /// CPU detail: headerless node,spec,value rows
        #[arg(long = "cpu-info", value_name = "FILE")]
        cpu_info: Option<PathBuf>,

        /// Group CPU nodes on cores, model and features (requires --cpu-info)
        #[arg(long, requires = "cpu_info")]
        detailed: bool,

        #[arg(long = "out-dir", value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// Write per-partition public tables from existing summaries
    Publish {
        /// Directory holding cpu_node_summary.csv and gpu_node_summary.csv
        #[arg(long = "summary-dir", value_name = "DIR")]
        summary_dir: PathBuf,

        #[arg(long = "cpu-info", value_name = "FILE")]
        cpu_info: PathBuf,

        #[arg(long = "out-dir", value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// Summarize, then publish, in one pass
    Run {
        #[arg(long, value_name = "FILE")]
        inventory: PathBuf,

        #[arg(long = "gpu-info", value_name = "FILE")]
        gpu_info: PathBuf,

        #[arg(long = "cpu-info", value_name = "FILE")]
        cpu_info: PathBuf,

        #[arg(long = "out-dir", value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// Expand a node range (e.g. node017-019;node100) one node per line
    Expand {
        #[arg(value_name = "RANGE")]
        range: String,
    },

    /// Compress node names into range notation
    Compress {
        #[arg(value_name = "NODE", required = true)]
        nodes: Vec<String>,
    },
}
