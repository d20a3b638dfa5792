use crate::policy::PolicyStore;
use crate::resolver::Action;
use crate::Result;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicI64, AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;
use tracing::{info, warn};

/// Interception counters shared between the handler and the admin API
#[derive(Debug)]
pub struct InterceptStats {
    pub total_requests: AtomicU64,
    pub matched_requests: AtomicU64,
    pub served_local: AtomicU64,
    pub served_remote: AtomicU64,
    pub redirected: AtomicU64,
    pub passed_through: AtomicU64,
    pub headers_injected: AtomicU64,
    pub rules_loaded: AtomicU64,
    last_reload_ms: AtomicI64,
    started_at: Instant,
}

impl Default for InterceptStats {
    fn default() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            matched_requests: AtomicU64::new(0),
            served_local: AtomicU64::new(0),
            served_remote: AtomicU64::new(0),
            redirected: AtomicU64::new(0),
            passed_through: AtomicU64::new(0),
            headers_injected: AtomicU64::new(0),
            rules_loaded: AtomicU64::new(0),
            last_reload_ms: AtomicI64::new(Utc::now().timestamp_millis()),
            started_at: Instant::now(),
        }
    }
}

impl InterceptStats {
    pub fn new(rules_loaded: usize) -> Self {
        let stats = Self::default();
        stats.rules_loaded.store(rules_loaded as u64, Ordering::Relaxed);
        stats
    }

    /// Count the outcome of a matched request
    pub fn record_action(&self, action: &Action) {
        self.matched_requests.fetch_add(1, Ordering::Relaxed);
        let counter = match action {
            Action::ServeLocal { .. } => &self.served_local,
            Action::ServeRemoteInline { .. } => &self.served_remote,
            Action::RedirectRemote { .. } => &self.redirected,
            Action::NoAction => &self.passed_through,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reload(&self, rules_loaded: usize) {
        self.rules_loaded.store(rules_loaded as u64, Ordering::Relaxed);
        self.last_reload_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_reload(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.last_reload_ms.load(Ordering::Relaxed))
            .single()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            matched_requests: self.matched_requests.load(Ordering::Relaxed),
            served_local: self.served_local.load(Ordering::Relaxed),
            served_remote: self.served_remote.load(Ordering::Relaxed),
            redirected: self.redirected.load(Ordering::Relaxed),
            passed_through: self.passed_through.load(Ordering::Relaxed),
            headers_injected: self.headers_injected.load(Ordering::Relaxed),
            rules_count: self.rules_loaded.load(Ordering::Relaxed),
            last_reload: self.last_reload(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub matched_requests: u64,
    pub served_local: u64,
    pub served_remote: u64,
    pub redirected: u64,
    pub passed_through: u64,
    pub headers_injected: u64,
    pub rules_count: u64,
    pub last_reload: Option<DateTime<Utc>>,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub status: String,
    pub rules: Option<usize>,
    pub error: Option<String>,
}

/// Shared state for the admin routes
#[derive(Clone)]
pub struct AdminState {
    pub stats: Arc<InterceptStats>,
    pub store: PolicyStore,
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/reload", post(reload_handler))
        .with_state(state)
}

pub async fn start_admin_server(port: u16, state: AdminState) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting Admin API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        crate::error::InterceptError::Network(format!("Failed to bind admin port {}: {}", port, e))
    })?;

    axum::serve(listener, router(state))
        .await
        .map_err(|e| crate::error::InterceptError::Network(format!("Admin server failed: {}", e)))?;

    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn stats_handler(State(state): State<AdminState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

async fn reload_handler(State(state): State<AdminState>) -> (StatusCode, Json<ReloadResponse>) {
    match state.store.reload().await {
        Ok(count) => {
            state.stats.record_reload(count);
            (
                StatusCode::OK,
                Json(ReloadResponse {
                    status: "ok".to_string(),
                    rules: Some(count),
                    error: None,
                }),
            )
        }
        Err(e) => {
            warn!("Reload failed, keeping current rules: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReloadResponse {
                    status: "error".to_string(),
                    rules: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
