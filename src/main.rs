use anyhow::{Context, Result};
use clap::Parser;
use nodeinv::cli::{Cli, Command, OutputFormat};
use nodeinv::config::Config;
use nodeinv::nodelist;
use nodeinv::pipeline::{self, RunReport, SummarizeInputs};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; warnings by default, everything with --debug
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_toml(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Config::embedded().context("Embedded default config is invalid"),
    }
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    match args.command {
        Command::Expand { range } => {
            let nodes = nodelist::expand(&range)?;
            match args.format {
                OutputFormat::Text => {
                    for node in &nodes {
                        println!("{}", node);
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string(&nodes)?),
            }
        }
        Command::Compress { nodes } => {
            // Arguments may themselves be range lists
            let compressed = nodelist::normalize(&nodes.join(";"))?;
            match args.format {
                OutputFormat::Text => println!("{}", compressed),
                OutputFormat::Json => println!("{}", serde_json::to_string(&compressed)?),
            }
        }
        Command::Summarize {
            inventory,
            gpu_info,
            cpu_info,
            detailed,
            out_dir,
        } => {
            let config = load_config(args.config.as_deref())?;
            let inputs = SummarizeInputs {
                inventory,
                gpu_info,
                cpu_info,
                detailed,
            };
            let report = pipeline::summarize(&inputs, &out_dir, &config)?;
            print_report(&report, args.format)?;
        }
        Command::Publish {
            summary_dir,
            cpu_info,
            out_dir,
        } => {
            let config = load_config(args.config.as_deref())?;
            let report = pipeline::publish(&summary_dir, &cpu_info, &out_dir, &config)?;
            print_report(&report, args.format)?;
        }
        Command::Run {
            inventory,
            gpu_info,
            cpu_info,
            out_dir,
        } => {
            let config = load_config(args.config.as_deref())?;
            let inputs = SummarizeInputs {
                inventory,
                gpu_info,
                cpu_info: Some(cpu_info),
                detailed: false,
            };
            let report = pipeline::run(&inputs, &out_dir, &config)?;
            print_report(&report, args.format)?;
        }
    }

    Ok(())
}
