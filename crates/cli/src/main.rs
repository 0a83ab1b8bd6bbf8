mod config;
mod reporter;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use clap::Parser;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use events::EventBus;
use orchestrator::codegen::DEFAULT_UPLOAD_DIR;
use orchestrator::{OutputFiles, Recorder};
use recorder_core::{AutomationSession, Ingress, VariableBindings};
use webdriver::{SessionOptions, WebDriverSession};
use websocket::{ws_handler, ClientConfig, WsState};

use crate::config::{load_config, load_hosts, DEFAULT_PATH_ATTRS};
use crate::reporter::ConsoleReporter;

const DEFAULT_PORT: u16 = 9765;
const DEFAULT_WEBDRIVER_URL: &str = "http://127.0.0.1:9766/wd/hub";
const INGRESS_CAPACITY: usize = 1024;

#[derive(Parser)]
#[command(name = "uirecorder")]
#[command(about = "Record browser interactions into self-checking test scripts", long_about = None)]
#[command(version)]
struct Cli {
    /// Script to write, relative to the working directory
    #[arg(short, long, default_value = "test.spec.js")]
    file: String,

    /// Record without replaying each step in a second browser
    #[arg(long)]
    no_checker: bool,

    /// Attributes the capture front-end prefers when building locators
    #[arg(long)]
    path_attrs: Option<String>,

    /// Port the capture front-end connects to
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// WebDriver endpoint; overrides `webdriver` in config.json
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Template with a `{$testCodes}` placeholder
    #[arg(long)]
    template: Option<PathBuf>,

    #[arg(long, default_value = config::CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd.join(&cli.config)).await?;
    let hosts = load_hosts(&cwd).await?;
    let template = match &cli.template {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read template {}", path.display()))?,
        ),
        None => None,
    };

    let webdriver_url = cli
        .webdriver_url
        .clone()
        .or_else(|| config.webdriver.clone())
        .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string());
    tracing::info!(url = %webdriver_url, "Using WebDriver endpoint");

    let options = SessionOptions::default().with_hosts(hosts);
    let (recorder, checker) = open_sessions(&webdriver_url, options, !cli.no_checker).await?;

    let event_bus = EventBus::new();
    let (ingress_tx, ingress_rx) = mpsc::channel(INGRESS_CAPACITY);

    let client_config = ClientConfig {
        path_attrs: cli
            .path_attrs
            .clone()
            .or_else(|| config.path_attrs.clone())
            .unwrap_or_else(|| DEFAULT_PATH_ATTRS.to_string()),
        test_vars: config.vars.clone(),
        spec_lists: OutputFiles::new(&cwd).list_modules().await?,
    };
    let state = Arc::new(WsState::new(event_bus.clone(), ingress_tx.clone(), client_config));
    let app = Router::new()
        .route("/", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cli.port))
        .await
        .with_context(|| format!("Failed to listen on port {}", cli.port))?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ingress_tx.send(Ingress::End).await;
        }
    });

    println!();
    println!("uirecorder - recording to {}", cli.file);
    println!("════════════════════════════════════════");
    println!();
    println!("  Front-end:  ws://localhost:{}/", cli.port);
    println!("  Checker:    {}", if checker.is_some() { "on" } else { "off" });
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let mut recorder = Recorder::new(recorder, checker, &cwd, cli.file.clone())
        .with_event_bus(event_bus)
        .with_reporter(Arc::new(ConsoleReporter))
        .with_bindings(VariableBindings::new(config.bindings()))
        .with_upload_dir(
            config
                .upload_dir
                .clone()
                .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string()),
        );
    if let Some(template) = template {
        recorder = recorder.with_template(template);
    }

    let summary = recorder.run(ingress_rx).await;

    let _ = shutdown_tx.send(());
    match server.await {
        Ok(Err(e)) => tracing::warn!(error = %e, "Front-end server stopped with an error"),
        Err(e) => tracing::warn!(error = %e, "Front-end server task failed"),
        Ok(Ok(())) => {}
    }

    summary.context("Recording failed")?;
    Ok(())
}

/// Open the recorder session and, if asked, the checker session.
///
/// A recorder session is never left behind when the checker fails to open.
async fn open_sessions(
    url: &str,
    options: SessionOptions,
    with_checker: bool,
) -> Result<(Arc<dyn AutomationSession>, Option<Arc<dyn AutomationSession>>)> {
    let recorder = open_session(url, options.clone(), "recorder").await?;
    if !with_checker {
        return Ok((recorder, None));
    }
    match open_session(url, options, "checker").await {
        Ok(checker) => Ok((recorder, Some(checker))),
        Err(e) => {
            close_quietly(recorder.as_ref(), "recorder").await;
            Err(e)
        }
    }
}

async fn open_session(
    url: &str,
    options: SessionOptions,
    role: &str,
) -> Result<Arc<dyn AutomationSession>> {
    let session = WebDriverSession::connect(url, options)
        .await
        .with_context(|| format!("Failed to create {role} browser session at {url}"))?;
    if let Err(e) = session.maximize_window().await {
        tracing::warn!(role, error = %e, "Failed to maximize window");
    }
    Ok(Arc::new(session))
}

/// Release a session that will not be used; failures are only logged.
async fn close_quietly(session: &dyn AutomationSession, role: &str) {
    if let Err(e) = session.close().await {
        tracing::warn!(role, error = %e, "Failed to close session");
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uirecorder=info,orchestrator=info,webdriver=info".into()),
        )
        .init();
}
