// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use crate::config::settings::ApiSettings;
use crate::error::Result;
use crate::transport::{ApiRequest, ExecuteRequest, HttpOutcome};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Api settings pointing at a local test server, compression off.
pub fn local_api(base_url: &str) -> Arc<ApiSettings> {
    Arc::new(ApiSettings {
        base_url: base_url.to_owned(),
        compression: false,
        timeout_ms: 5_000,
        ..ApiSettings::default()
    })
}

pub fn success(status: u16, body: serde_json::Value) -> HttpOutcome {
    HttpOutcome::Success { status, raw_body: body.to_string() }
}

pub fn raw_success(raw_body: &str) -> HttpOutcome {
    HttpOutcome::Success { status: 200, raw_body: raw_body.to_owned() }
}

pub fn failure(status: u16, body: &str) -> HttpOutcome {
    HttpOutcome::Failure { status, raw_body: body.to_owned() }
}

/// In-memory executor replaying canned outcomes and recording every call
/// together with the (possibly paused) clock reading.
#[derive(Default)]
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<HttpOutcome>>,
    calls: Mutex<Vec<(ApiRequest, Instant)>>,
}

impl ScriptedExecutor {
    pub fn new(outcomes: Vec<HttpOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().iter().map(|(request, _)| request.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Milliseconds elapsed between consecutive calls.
    pub fn gaps_ms(&self) -> Vec<u128> {
        let calls = self.calls.lock().unwrap();
        calls
            .windows(2)
            .map(|pair| pair[1].1.duration_since(pair[0].1).as_millis())
            .collect()
    }
}

impl ExecuteRequest for ScriptedExecutor {
    async fn execute(&self, request: &ApiRequest) -> Result<HttpOutcome> {
        self.calls.lock().unwrap().push((request.clone(), Instant::now()));
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| failure(500, "script exhausted")))
    }
}
