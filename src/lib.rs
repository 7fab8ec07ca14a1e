//! nodeinv - Slurm node inventory summarizer
//!
//! This library turns a scheduler node dump plus per-node GPU and CPU detail
//! into compact partition summary tables, and extracts per-partition public
//! tables from those summaries. Node sets are written in range notation
//! (`node017-019;node100`).

pub mod cli;
pub mod config;
pub mod csv_input;
pub mod csv_output;
pub mod filter;
pub mod hardware;
pub mod inventory;
pub mod join;
pub mod node_id;
pub mod nodelist;
pub mod pipeline;
pub mod publish;
pub mod signature;
pub mod summarize;
