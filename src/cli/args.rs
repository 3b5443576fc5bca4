use crate::utils::constants::{DEFAULT_CLUSTERS, DEFAULT_MINI_BATCH_SIZE, DEFAULT_SEED};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "epg-etl")]
#[command(about = "Load TV subscriber and EPG viewing exports into PostgreSQL and segment viewers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Also write plain-text logs to this file")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file [default: epg-etl.toml if present]"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean the CSV exports and load them into the database
    Load {
        #[arg(short, long, help = "Directory containing the CSV exports")]
        input_dir: Option<PathBuf>,

        #[arg(long, help = "EPG statistics file name, e.g. epg_stat_2024_10.csv")]
        epg_file: Option<String>,

        #[arg(long, help = "Create missing tables before loading")]
        create_tables: bool,
    },

    /// Clean the CSV exports against each other without touching the database
    Check {
        #[arg(short, long, help = "Directory containing the CSV exports")]
        input_dir: Option<PathBuf>,

        #[arg(long, help = "EPG statistics file name")]
        epg_file: Option<String>,

        #[arg(short, long, help = "Write the cleaned tables into this directory")]
        output_dir: Option<PathBuf>,
    },

    /// Segment subscribers by their viewing history
    Cluster {
        #[arg(short = 'k', long, default_value_t = DEFAULT_CLUSTERS)]
        clusters: usize,

        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        #[arg(long, help = "Use mini-batch k-means")]
        mini_batch: bool,

        #[arg(long, default_value_t = DEFAULT_MINI_BATCH_SIZE)]
        batch_size: usize,

        #[arg(short, long, help = "Write the cluster report as JSON")]
        output: Option<PathBuf>,
    },

    /// Cluster the built-in three-subscriber sample
    Demo {
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },

    /// Create the database tables
    InitDb,
}
