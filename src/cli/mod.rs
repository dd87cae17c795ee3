pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "consul-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Consul cluster check: leader tracking, health and catalog metrics", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Poll every configured instance on the collection interval")]
    Run {
        #[arg(short, long, help = "Path to the check configuration (YAML)")]
        config: PathBuf,

        #[arg(long, help = "Run a single cycle and exit")]
        once: bool,
    },
    #[command(about = "Run one cycle and export the collected metrics")]
    Export {
        #[arg(short, long, help = "Path to the check configuration (YAML)")]
        config: PathBuf,

        #[arg(
            short,
            long,
            default_value = "prometheus",
            help = "Output format (prometheus, json)"
        )]
        format: String,

        #[arg(short, long, help = "Output file path")]
        output: Option<PathBuf>,
    },
    #[command(about = "Display cluster information for one agent")]
    Info {
        #[arg(
            short,
            long,
            default_value = "http://localhost:8500",
            help = "Agent HTTP API base URL"
        )]
        url: String,

        #[arg(short, long, help = "List the services registered on this node")]
        node: Option<String>,
    },
}
