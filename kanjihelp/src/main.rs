use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kanjihelp::api::{create_router, AppState};
use kanjihelp::capture::{ScanBox, StillImageDevice};
use kanjihelp::config::Config;
use kanjihelp::ocr::{EnginePool, OcrEngineFactory, RecognitionMode};
use kanjihelp::scan::{ScanOrchestrator, ScanResult, ScanSettings, ScanStatus};
use kanjihelp::segmentation::{DictionaryFileBuilder, SegmentationGateway};
use kanjihelp::translation::{TranslationProvider, WordTranslation};

#[derive(Parser)]
#[command(name = "kanjihelp")]
#[command(about = "Furigana and text capture for Japanese learners")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Print furigana for TEXT as JSON
    Annotate { text: String },
    /// Scan a still image through the capture pipeline
    Scan {
        image: PathBuf,
        /// Scan box preset; `tall` recognizes vertical text
        #[arg(long = "box", value_enum, default_value_t = ScanBox::Wide)]
        scan_box: ScanBox,
        /// Scan continuously for SECS seconds instead of once
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
        /// Add word translations for each detected result
        #[arg(long)]
        translate: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanOutput {
    #[serde(flatten)]
    result: ScanResult,
    status: ScanStatus,
    message: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    translations: Vec<WordTranslation>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kanjihelp=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Annotate { text } => annotate(config, &text).await,
        Command::Scan {
            image,
            scan_box,
            watch,
            translate,
        } => scan(config, image, scan_box, watch, translate).await,
    }
}

fn segmentation_gateway(config: &Config) -> SegmentationGateway {
    SegmentationGateway::new(Arc::new(DictionaryFileBuilder::new(
        &config.segmentation.dictionary_path,
    )))
}

fn engine_pool(config: &Config) -> Arc<EnginePool> {
    tracing::info!("Initializing OCR backend: {}...", config.ocr.model);
    let factory = OcrEngineFactory::new(&config.ocr);
    if !factory.is_available() {
        tracing::warn!("OCR unavailable - recognition requests will fail");
    }
    Arc::new(EnginePool::new(Arc::new(factory)))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let segmentation = segmentation_gateway(&config);
    let engines = engine_pool(&config);
    let translation = TranslationProvider::new(&config.translation);
    if !translation.is_available() {
        tracing::warn!("Translation unavailable - set DEEPL_API_KEY to enable /translate");
    }

    let cancel_token = CancellationToken::new();

    tracing::info!(
        "Loading segmentation dictionary: {}...",
        config.segmentation.dictionary_path
    );
    let gateway = segmentation.clone();
    let token = cancel_token.child_token();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            result = gateway.initialize() => match result {
                Ok(()) => tracing::info!("Segmentation dictionary ready"),
                Err(e) => tracing::error!("Segmentation dictionary failed to load: {}", e),
            },
        }
    });

    if config.ocr.warm_start {
        for mode in RecognitionMode::ALL {
            let pool = Arc::clone(&engines);
            let token = cancel_token.child_token();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    result = pool.acquire(mode) => {
                        if let Err(e) = result {
                            tracing::warn!(%mode, "OCR warm start failed: {}", e);
                        }
                    }
                }
            });
        }
    }

    let state = AppState::new(
        config.clone(),
        segmentation,
        Arc::clone(&engines),
        translation,
    );
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Kanjihelp starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    engines.shutdown().await;
    Ok(())
}

async fn annotate(config: Config, text: &str) -> anyhow::Result<()> {
    let gateway = segmentation_gateway(&config);
    gateway
        .initialize()
        .await
        .context("failed to load segmentation dictionary")?;

    let furigana = gateway.furigana(text).await?;
    println!("{}", serde_json::to_string_pretty(&furigana)?);
    Ok(())
}

async fn scan(
    config: Config,
    image: PathBuf,
    scan_box: ScanBox,
    watch: Option<u64>,
    translate: bool,
) -> anyhow::Result<()> {
    let gateway = segmentation_gateway(&config);
    gateway
        .initialize()
        .await
        .context("failed to load segmentation dictionary")?;

    let engines = engine_pool(&config);
    let translation = translate.then(|| TranslationProvider::new(&config.translation));
    let orchestrator = ScanOrchestrator::new(
        Arc::new(StillImageDevice::from_path(image)),
        Arc::clone(&engines),
        gateway,
        ScanSettings::from_config(&config.capture, scan_box),
    );

    let outcome = match orchestrator.start_capture().await {
        Ok(()) => match watch {
            None => match orchestrator.capture().await {
                Ok(result) => print_result(result, translation.as_ref()).await,
                Err(e) => Err(e.into()),
            },
            Some(secs) => watch_scan(&orchestrator, secs, translation.as_ref()).await,
        },
        Err(e) => Err(e.into()),
    };

    orchestrator.reset().await;
    engines.shutdown().await;
    outcome
}

async fn watch_scan(
    orchestrator: &ScanOrchestrator,
    secs: u64,
    translation: Option<&TranslationProvider>,
) -> anyhow::Result<()> {
    let mut results = orchestrator.subscribe();
    orchestrator.start_scanning().await?;

    let deadline = tokio::time::sleep(Duration::from_secs(secs));
    tokio::pin!(deadline);
    let outcome = loop {
        tokio::select! {
            _ = &mut deadline => break Ok(()),
            _ = tokio::signal::ctrl_c() => break Ok(()),
            received = results.recv() => match received {
                Ok(result) => {
                    if let Err(e) = print_result(result, translation).await {
                        break Err(e);
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Scan output fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break Ok(()),
            },
        }
    };

    orchestrator.stop_scanning().await?;
    outcome
}

async fn print_result(
    result: ScanResult,
    translation: Option<&TranslationProvider>,
) -> anyhow::Result<()> {
    let translations = match translation {
        Some(provider) => provider.enrich(&result).await,
        None => Vec::new(),
    };
    let status = result.status();
    let output = ScanOutput {
        result,
        status,
        message: status.user_message(),
        translations,
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
