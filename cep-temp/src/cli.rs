use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use cep_temp_core::{Config, Deadline, StageTimeouts, TemperatureService, providers_from_config};
use clap::{Parser, Subcommand};
use inquire::Password;
use tokio::net::TcpListener;

use crate::http::{self, AppState};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cep-temp", version, about = "Current temperature for a Brazilian CEP")]
pub struct Cli {
    /// Path to the config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP service.
    Serve {
        /// Address to listen on, e.g. "0.0.0.0:8080". Overrides the config file.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Resolve one CEP and print the result as JSON.
    Lookup {
        /// Eight-digit postal code.
        cep: String,
    },

    /// Store the HG Weather API key in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = self.config.as_deref();

        match self.command {
            Command::Configure => {
                let mut cfg = Config::load_file(path)?;
                let api_key = Password::new("HG Weather API key:")
                    .without_confirmation()
                    .prompt()
                    .context("Failed to read API key")?;
                cfg.set_api_key(api_key.trim().to_string());
                let saved = cfg.save(path)?;
                println!("Saved configuration to {}", saved.display());
            }
            Command::Serve { bind } => {
                let mut cfg = Config::load(path)?;
                if let Some(bind) = bind {
                    cfg.server.bind_address = bind;
                }
                serve(cfg).await?;
            }
            Command::Lookup { cep } => {
                let cfg = Config::load(path)?;
                let service = build_service(&cfg)?;
                let deadline = Deadline::after(cfg.timeouts.request());

                let report = service.lookup(&cep, &deadline).await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }

        Ok(())
    }
}

fn build_service(cfg: &Config) -> anyhow::Result<TemperatureService> {
    let providers = providers_from_config(cfg)?;
    Ok(TemperatureService::from_providers(providers, StageTimeouts::from(&cfg.timeouts)))
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    let addr = cfg.bind_address()?;
    let state = AppState {
        service: Arc::new(build_service(&cfg)?),
        request_timeout: cfg.timeouts.request(),
    };

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
