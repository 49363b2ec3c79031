use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use job_aggregator::{AggregationService, AggregatorConfig, ExperienceLevel, JobBoard, SalaryRange, SearchParams};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "job-aggregator", about = "Search job boards, government listings and company feeds at once")]
struct Cli {
    /// Mix the built-in seed jobs into results
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one aggregated search and print the result as JSON
    Search {
        query: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        radius: Option<u32>,
        /// "$50k - $80k", "$80k - $120k", "$120k - $180k" or "$180k+"
        #[arg(long)]
        salary_range: Option<SalaryRange>,
        /// Full-time, Part-time, Contract or Internship
        #[arg(long = "type")]
        job_type: Option<String>,
        /// Entry, Mid-level or Senior
        #[arg(long)]
        experience: Option<ExperienceLevel>,
        #[arg(long)]
        remote: Option<bool>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// List the configured company feeds
    Feeds,
    /// Print cache and source statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AggregatorConfig::from_env();
    config.development_mode |= cli.dev;

    match cli.command {
        Command::Feeds => {
            for feed in &config.feeds {
                let state = if feed.enabled { "enabled" } else { "disabled" };
                println!("{:<24} {:<18} {:<9} {}", feed.name, feed.company, state, feed.url);
            }
        }
        Command::Stats => {
            let service = AggregationService::from_config(config).context("failed to build aggregation service")?;
            let stats = service.get_stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Search {
            query,
            location,
            radius,
            salary_range,
            job_type,
            experience,
            remote,
            limit,
            page,
        } => {
            let params = SearchParams {
                query,
                location,
                radius,
                salary_range,
                job_type,
                experience_level: experience,
                remote,
                limit,
                page,
            };
            let service = AggregationService::from_config(config).context("failed to build aggregation service")?;
            let result = service.aggregate_jobs(&params).await;
            info!(
                "{} jobs from {:?} in {}ms",
                result.total, result.sources, result.execution_time_ms
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
