//! Test server harness for E2E testing
//!
//! Provides TestTokenServer for spawning real token service instances in tests.

use crate::crypto_fixtures::test_config;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use token_service::config::Config;
use token_service::routes::{self, AppState};

/// Test harness for spawning the token service in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_issue_token_e2e() -> Result<()> {
///     let server = TestTokenServer::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .post(format!("{}/api/token", server.url()))
///         .json(&serde_json::json!({ "roomName": "demo" }))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestTokenServer {
    addr: SocketAddr,
    config: Config,
    handle: JoinHandle<()>,
}

impl TestTokenServer {
    /// Spawn a server with the fixed test configuration
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_config(test_config()).await
    }

    /// Spawn a new test server instance
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Build the real router from `config`
    /// - Start the HTTP server in the background
    pub async fn spawn_with_config(config: Config) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState::from_config(config.clone()));

        // The global recorder can only be installed once per process; later
        // servers get a standalone recorder.
        let metrics_handle = match routes::init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Request a token over HTTP and return the parsed JSON body
    pub async fn request_token(
        &self,
        room_name: Option<&str>,
        participant_name: Option<&str>,
    ) -> Result<(reqwest::StatusCode, serde_json::Value), anyhow::Error> {
        let mut body = serde_json::Map::new();
        if let Some(room) = room_name {
            body.insert("roomName".to_string(), room.into());
        }
        if let Some(participant) = participant_name {
            body.insert("participantName".to_string(), participant.into());
        }

        let response = reqwest::Client::new()
            .post(format!("{}/api/token", self.url()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let json = response.json().await?;
        Ok((status, json))
    }
}

impl Drop for TestTokenServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
