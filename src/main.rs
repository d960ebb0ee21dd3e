use std::process::ExitCode;

use anyhow::{Result, anyhow};
use clap::Parser;
use hubhook::Configuration;
use tokio::{signal, task::JoinSet};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Opt {
    /// Extra YAML configuration files, later files take precedence
    #[clap(short, long, value_parser)]
    pub config: Vec<std::path::PathBuf>,
}

async fn run(options: Opt) -> Result<()> {
    let config = Configuration::config(Configuration::figment(options.config))?;
    let engine = hubhook::docker_engine()?;

    let mut tasks = JoinSet::new();
    hubhook::start(&mut tasks, config, engine);

    tokio::select! {
        res = signal::ctrl_c() => {
            if let Err(err) = res {
                warn!("Unable to listen for shutdown signal: {err}");
            }
            info!("Shutting down");
            tasks.shutdown().await;
            Ok(())
        }
        Some(res) = tasks.join_next() => {
            match res {
                Ok(Ok(())) => Err(anyhow!("Listener stopped unexpectedly")),
                Ok(Err(err)) => Err(err),
                Err(err) => Err(err.into()),
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = Opt::parse();

    match run(options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Fatal: {err:?}");
            ExitCode::FAILURE
        }
    }
}
