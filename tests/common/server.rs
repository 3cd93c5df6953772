//! Test server lifecycle management
//!
//! Each test gets an isolated server backed by its own temporary insights.db.

use super::constants::*;
use insights_scan_server::insights::{
    InsightsService, InsightsStore, PassSummary, ProcessorSettings, ScanJobProcessor, ScanPoller,
    ScenarioAnalyzer, SqliteInsightsStore,
};
use insights_scan_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test server instance with an isolated database
///
/// When dropped, the server (and its poller, if any) shuts down and the
/// temporary database is removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Service for driving passes directly from tests
    pub service: Arc<InsightsService>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    poller_shutdown: Option<CancellationToken>,
}

impl TestServer {
    /// Spawns a server without a background poller; tests trigger passes
    /// through [`TestServer::process_pending_jobs`].
    pub async fn spawn() -> Self {
        Self::spawn_inner(None).await
    }

    /// Spawns a server with a poller running at `FAST_POLL_INTERVAL_MS`.
    pub async fn spawn_with_poller() -> Self {
        Self::spawn_inner(Some(Duration::from_millis(FAST_POLL_INTERVAL_MS))).await
    }

    async fn spawn_inner(poll_interval: Option<Duration>) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_db_dir.path().join("insights.db");

        let store: Arc<dyn InsightsStore> =
            Arc::new(SqliteInsightsStore::new(&db_path).expect("Failed to open insights store"));
        let processor = Arc::new(ScanJobProcessor::new(
            store.clone(),
            Arc::new(ScenarioAnalyzer::new()),
            ProcessorSettings::default(),
        ));
        let service = Arc::new(InsightsService::new(store, processor.clone()));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..ServerConfig::default()
        };
        let app = make_app(config, service.clone());

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let poller_shutdown = poll_interval.map(|interval| {
            let token = CancellationToken::new();
            let poller = ScanPoller::new(processor, interval);
            let poller_token = token.clone();
            tokio::spawn(async move { poller.run(poller_token).await });
            token
        });

        let server = Self {
            base_url,
            port,
            service,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
            poller_shutdown,
        };

        server.wait_for_ready().await;

        server
    }

    /// Runs one processing pass synchronously.
    pub async fn process_pending_jobs(&self) -> PassSummary {
        self.service.process_pending_jobs().await
    }

    /// Waits for the server to become ready by polling the / endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(token) = self.poller_shutdown.take() {
            token.cancel();
        }
    }
}
