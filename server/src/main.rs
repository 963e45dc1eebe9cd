use anyhow::Context;
use chrono::DateTime;
use clap::Parser;
use cli::{Cli, Command};
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use config::config;
use pipeline::Pipeline;
use retry::RetryConfig;
use source::HttpSource;
use store::SqliteStore;

mod cli;
mod config;
mod export;
mod parsers;
mod pipeline;
mod retention;
mod retry;
mod server;
mod source;
mod store;
mod strategies;
mod synthetic;
mod text;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Cli::parse();

    if let Err(e) = exec(args).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn exec(args: Cli) -> anyhow::Result<()> {
    let config = config();
    let store = Arc::new(SqliteStore::open(&args.database_url)?);
    let source = Arc::new(
        HttpSource::new(&config.source_url, config.fetch_timeout())?
            .with_retry_config(RetryConfig::default().with_max_attempts(config.fetch_attempts)),
    );
    let pipeline = Arc::new(Pipeline::new(source, store, config));

    match args.cmd {
        Command::Refresh(owner) => {
            if let Some(status) = pipeline.run(&owner.owner).await {
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
        }
        Command::Watch { owner, interval } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.refresh_interval());
            tokio::select! {
                _ = pipeline.clone().watch(owner.owner, interval) => {}
                _ = tokio::signal::ctrl_c() => log::info!("Interrupted, stopping"),
            }
        }
        Command::Export { owner, output } => {
            let history = pipeline.history(&owner.owner).await;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    export::write_csv(file, &history)?;
                    println!("Exported {} rows to {}", history.len(), path.display());
                }
                None => export::write_csv(std::io::stdout().lock(), &history)?,
            }
        }
        Command::Show { owner, limit } => {
            let history = pipeline.history(&owner.owner).await;
            if history.is_empty() {
                println!("No data for {} yet. Run `windlog refresh` to start.", owner.owner);
                return Ok(());
            }
            if let Some(at) = pipeline
                .last_update_millis(&owner.owner)
                .and_then(DateTime::from_timestamp_millis)
            {
                let at = at.with_timezone(&config.source_offset());
                println!("Last update: {}", at.format("%d/%m/%Y %H:%M"));
            }
            for obs in history.iter().take(limit) {
                println!(
                    "{} {}  {:>3} {:>3} {:>3} kn  {:<3} {:>3}°  {:>3}°C",
                    obs.date,
                    obs.time,
                    obs.min_speed_knots,
                    obs.avg_speed_knots,
                    obs.gust_speed_knots,
                    obs.direction,
                    obs.degrees,
                    obs.temperature_celsius
                );
            }
        }
        Command::Http { address, watch } => {
            for owner in watch {
                tokio::spawn(pipeline.clone().watch(owner, config.refresh_interval()));
            }
            server::run(address, pipeline).await;
        }
    }

    Ok(())
}
