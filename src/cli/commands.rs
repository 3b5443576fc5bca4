use crate::cli::args::{Cli, Commands};
use crate::config::{AppConfig, PipelineConfig};
use crate::database::{connect, create_tables, ReportSource};
use crate::error::Result;
use crate::pipeline::{check_sources, EtlPipeline};
use crate::processors::{
    segment_subscribers, DemoDataset, KMeans, MiniBatchKMeans, Partitioner,
};
use crate::readers::CsvTableReader;
use crate::utils::init_logging;
use crate::utils::progress::ProgressReporter;
use crate::writers::CsvTableWriter;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tokio_postgres::Client;
use tracing::{debug, info};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    debug!("Verbose logging enabled");

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Load {
            input_dir,
            epg_file,
            create_tables: create,
        } => {
            let pipeline_config = source_files(config.pipeline, input_dir, epg_file);
            println!(
                "Loading exports from {} into {}",
                pipeline_config.input_dir.display(),
                config.database.name
            );

            let mut client = connect(&config.database).await?;
            if create {
                client = ensure_tables(client).await?;
            }

            let mut pipeline = EtlPipeline::new(client, pipeline_config).with_progress(true);
            let summary = pipeline.run().await;
            drop(pipeline.into_store());
            info!("Connection closed");

            println!("\n{}", summary.generate_summary());
        }

        Commands::Check {
            input_dir,
            epg_file,
            output_dir,
        } => {
            let pipeline_config = source_files(config.pipeline, input_dir, epg_file);
            println!(
                "Checking exports in {}",
                pipeline_config.input_dir.display()
            );

            let progress = ProgressReporter::new_spinner("Cleaning source files...", false);
            let check = check_sources(&pipeline_config, &CsvTableReader::new());
            progress.finish_with_message(&format!("Cleaned {} tables", check.tables.len()));

            println!("\n{}", check.summary.generate_summary());

            if let Some(dir) = output_dir {
                let writer = CsvTableWriter::new();
                for table in &check.tables {
                    let path = writer.write_into_dir(table, &dir)?;
                    println!("Wrote {}", path.display());
                }
            }
        }

        Commands::Cluster {
            clusters,
            seed,
            mini_batch,
            batch_size,
            output,
        } => {
            let client = connect(&config.database).await?;
            let records = client.viewing_records().await;
            drop(client);
            info!("Connection closed");
            let records = records?;

            let partitioner: Box<dyn Partitioner> = if mini_batch {
                Box::new(
                    MiniBatchKMeans::new(clusters)
                        .with_seed(seed)
                        .with_batch_size(batch_size),
                )
            } else {
                Box::new(KMeans::new(clusters).with_seed(seed))
            };

            let segmentation = segment_subscribers(&records, partitioner.as_ref())?;
            println!("\n{}", segmentation.report.generate_summary());

            if let Some(path) = output {
                let file = BufWriter::new(File::create(&path)?);
                serde_json::to_writer_pretty(file, &segmentation.report)?;
                println!("Report written to {}", path.display());
            }
        }

        Commands::Demo { seed } => {
            let demo = DemoDataset::sample();
            let labels = demo.cluster(seed)?;
            println!("{}", demo.render(&labels));
        }

        Commands::InitDb => {
            let client = connect(&config.database).await?;
            drop(ensure_tables(client).await?);
            info!("Connection closed");
            println!("Tables ready in {}", config.database.name);
        }
    }

    Ok(())
}

/// Create missing tables, closing the connection if that fails.
async fn ensure_tables(client: Client) -> Result<Client> {
    if let Err(e) = create_tables(&client).await {
        drop(client);
        info!("Connection closed");
        return Err(e);
    }
    Ok(client)
}

fn source_files(
    config: PipelineConfig,
    input_dir: Option<PathBuf>,
    epg_file: Option<String>,
) -> PipelineConfig {
    let config = match input_dir {
        Some(dir) => config.with_input_dir(dir),
        None => config,
    };
    match epg_file {
        Some(name) => config.with_epg_stat_file(name),
        None => config,
    }
}
