//! `vdm serve` – run the HTTP service until Ctrl-C/SIGTERM.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use vdm_core::config::VdmConfig;
use vdm_core::controller::{ControllerSettings, JobController};
use vdm_core::extractor::ProcessExtractor;
use vdm_core::store::JobStore;

use crate::api;

pub async fn run_serve(
    mut cfg: VdmConfig,
    bind: Option<String>,
    downloads_dir: Option<PathBuf>,
) -> Result<()> {
    if let Some(bind) = bind {
        cfg.bind_addr = bind;
    }
    if let Some(dir) = downloads_dir {
        cfg.downloads_dir = Some(dir);
    }

    let settings = ControllerSettings::from_config(&cfg)?;
    tokio::fs::create_dir_all(&settings.downloads_dir)
        .await
        .with_context(|| {
            format!(
                "create downloads dir {}",
                settings.downloads_dir.display()
            )
        })?;

    let store = JobStore::open(&cfg).await?;
    let extractor = Arc::new(ProcessExtractor::new(cfg.extractor.clone()));
    let controller = JobController::new(store, extractor, settings);
    controller.recover().await?;

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("bind {}", cfg.bind_addr))?;
    tracing::info!(
        addr = %cfg.bind_addr,
        downloads = %controller.downloads_dir().display(),
        "vdm listening"
    );
    println!("vdm listening on http://{}", cfg.bind_addr);

    let app = api::router(controller.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    controller.shutdown().await;
    tracing::info!("vdm stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("ctrl-c handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown requested");
}
