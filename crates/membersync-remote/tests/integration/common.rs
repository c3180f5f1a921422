//! Shared test helpers for remote client integration tests
//!
//! Provides wiremock-based mock server setup for the downstream member API.
//! Retry backoff is shrunk to a few milliseconds so the full retry schedule
//! runs in test time.

use std::time::Duration;

use wiremock::MockServer;

use membersync_remote::{HttpRemoteSystem, RemoteClient, RemoteClientConfig};

/// Backoff base used in tests (production default is 1s)
pub const TEST_RETRY_BASE: Duration = Duration::from_millis(5);

/// Starts a mock server and returns it with a client pointed at it.
pub async fn setup_client() -> (MockServer, RemoteClient) {
    let server = MockServer::start().await;
    let config = RemoteClientConfig::new(server.uri())
        .with_api_key("test-api-key")
        .with_retry_base(TEST_RETRY_BASE);
    let client = RemoteClient::new(config).expect("Failed to build client");
    (server, client)
}

/// Starts a mock server and returns it with an `IRemoteSystem` adapter.
pub async fn setup_system() -> (MockServer, HttpRemoteSystem) {
    let (server, client) = setup_client().await;
    (server, HttpRemoteSystem::new(client))
}
