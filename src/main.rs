use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod engine;
mod error;
mod jobs;
mod model;
mod models;
mod routes;
mod store;
#[cfg(test)]
mod test_support;
mod utils;

use crate::api::{AppState, local_now};
use crate::docs::ApiDoc;
use crate::model::processor_log::RunTrigger;
use crate::store::SharedStore;
use crate::store::mysql::MySqlStore;
use config::Config;
use db::{init_db, run_migrations};
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

/// Attendance service for the HRM system.
#[derive(Parser, Debug)]
#[command(name = "hrm-attendance", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Reconcile punches; defaults to the scheduled window ending today.
    Process {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Record the run as the host scheduler's hourly job.
        #[arg(long, conflicts_with_all = ["from", "to"])]
        scheduled: bool,
    },
    /// Store the anomaly summary for a day (default yesterday).
    Summarize {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Compute overtime for a day (default yesterday).
    Overtime {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Apply database migrations and exit.
    Migrate,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    let pool = init_db(&config.database_url, config.db_max_connections).await?;
    let store: SharedStore = Arc::new(MySqlStore::new(pool.clone()));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(store, config).await,
        Command::Migrate => {
            run_migrations(&pool).await?;
            info!("Migrations applied");
            Ok(())
        }
        Command::Process { from, to, scheduled } => {
            let state = AppState::new(store, config);
            let now = local_now();
            let window_days = state.config.processing_window_days;
            let log = if scheduled {
                jobs::hourly_reconciliation(&state.reconciler, window_days, now).await?
            } else {
                let (from, to) = jobs::processing_window(from, to, window_days, now);
                state
                    .reconciler
                    .process_window(from, to, RunTrigger::Manual, now)
                    .await?
            };
            println!("{}", serde_json::to_string_pretty(&log)?);
            Ok(())
        }
        Command::Summarize { date } => {
            let now = local_now();
            let summary = match date {
                Some(date) => engine::summary::summarize_date(store.as_ref(), date, now).await?,
                None => jobs::daily_anomaly_snapshot(store.as_ref(), now).await?,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Overtime { date } => {
            let report = match date {
                Some(date) => engine::overtime::process_overtime_for_date(store.as_ref(), date).await?,
                None => jobs::daily_overtime(store.as_ref(), local_now()).await?,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(store: SharedStore, config: Config) -> anyhow::Result<()> {
    info!(addr = %config.server_addr, "Server starting...");

    let server_addr = config.server_addr.clone();
    let state = Data::new(AppState::new(store, config.clone()));
    let config_data = Data::new(config.clone());

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await
    .context("HTTP server failed")
}
