//! SantiFS sync tool
//!
//! Runs one pass mirroring `WATCH_DIR` into a Notion database, then exits.
//! Exit code 1 on missing configuration or a failed pass.

use anyhow::{Context, Result};
use bridge_desktop::{FileUriGenerator, LocalServerLinkGenerator, ReqwestHttpClient};
use bridge_traits::links::LinkGenerator;
use core_runtime::config::{LinkMode, SyncSettings};
use core_runtime::logging::{init_logging, redact_if_sensitive};
use core_sync::{FileRecordFactory, SyncReport, Synchronizer};
use provider_notion::NotionRepository;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let settings = match SyncSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(settings.logging.clone()) {
        eprintln!("ERROR: {e}");
        return ExitCode::FAILURE;
    }

    match run(&settings).await {
        Ok(report) => {
            info!(
                remote_rows = report.remote_rows,
                processed = report.processed,
                created = report.created,
                updated = report.updated,
                skipped = report.skipped,
                failed = report.failed,
                archived = report.archived,
                duration_ms = report.duration().num_milliseconds(),
                "Sync finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "CRITICAL FAILURE");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: &SyncSettings) -> Result<SyncReport> {
    if !settings.watch_dir_exists() {
        warn!(
            watch_dir = %settings.watch_dir.display(),
            "Watch directory does not exist. Ensure the volume is mounted."
        );
    }

    info!(
        watch_dir = %settings.watch_dir.display(),
        device = %settings.device_name,
        link_mode = ?settings.link_mode,
        token = %redact_if_sensitive("token", &settings.notion_token),
        "SantiFS sync tool starting"
    );

    let factory = FileRecordFactory::new(&settings.watch_dir, settings.device_name.clone());

    let link_generator: Arc<dyn LinkGenerator> = match settings.link_mode {
        LinkMode::FileUri => Arc::new(FileUriGenerator::new(factory.root())),
        LinkMode::LocalServer => {
            Arc::new(LocalServerLinkGenerator::new(settings.link_server_port))
        }
    };

    let http_client = Arc::new(ReqwestHttpClient::new().context("Failed to build HTTP client")?);

    let repository = NotionRepository::connect(
        http_client,
        settings.notion_token.clone(),
        &settings.database_id,
        link_generator,
    )
    .await;

    info!(
        database_id = %repository.database_id(),
        relation_property = repository.relation_property().unwrap_or("none"),
        "Connected to Notion database"
    );

    let mut synchronizer =
        Synchronizer::new(Box::new(repository), factory, settings.watch_dir.clone());

    synchronizer.sync().await.context("Sync pass failed")
}
