//! Shared test harness for integration tests.
//!
//! [`TestHarness`] wires an [`AppContext`] to the recording fakes so router
//! tests can drive teardowns and assert on the exact calls made.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::Router;
use http_body_util::BodyExt;

use liveops::config::Config;
use liveops::context::AppContext;
use liveops::server::create_router;
use liveops_teardown::testing::{FakeMediaClient, FakeStore};
use liveops_teardown::{TeardownOrchestrator, TeardownSettings};

pub struct TestHarness {
    pub ctx: AppContext,
    pub media: FakeMediaClient,
    pub store: FakeStore,
}

impl TestHarness {
    pub fn new(media: FakeMediaClient) -> Self {
        Self::with_config(media, test_config())
    }

    pub fn with_config(media: FakeMediaClient, config: Config) -> Self {
        let store = media.store();
        let ctx = AppContext::new(config, Arc::new(media.clone()), Arc::new(store.clone()));
        Self { ctx, media, store }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Serve the router on a random local port.
    pub async fn with_server(media: FakeMediaClient) -> (Self, SocketAddr) {
        Self::serve(Self::new(media)).await
    }

    pub async fn serve(self) -> (Self, SocketAddr) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (self, addr)
    }
}

/// Config pointing at the fakes' account with fast polling.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.media.subscription_id = "sub".into();
    config.media.resource_group = "rg".into();
    config.media.account_name = "acct".into();
    config.teardown.stop_poll_interval_ms = 1;
    config.teardown.stop_max_wait_secs = 5;
    config
}

/// Orchestrator over `media` and its recording store with fast polling.
pub fn orchestrator(media: &FakeMediaClient, store: FakeStore) -> TeardownOrchestrator {
    TeardownOrchestrator::new(
        Arc::new(media.clone()),
        Arc::new(store),
        TeardownSettings {
            stop_poll_interval: Duration::from_millis(1),
            stop_max_wait: Some(Duration::from_secs(5)),
        },
    )
}

pub async fn body_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
