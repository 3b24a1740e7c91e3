use crate::models::StatusResponse;
use crate::AppState;
use axum::{extract::State, Json};
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::{info, warn};

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Runtime status endpoint
///
/// Reports uptime, session and cache gauges, storage reachability and
/// system resource usage. Always answers 200; an unreachable store shows
/// up in the `storage` field rather than as an error status.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    // Probe the store with a cheap read of the newest note
    let storage = match state.store.find_latest().await {
        Ok(_) => "reachable".to_string(),
        Err(e) => {
            warn!("Status probe could not reach storage: {}", e);
            "unreachable".to_string()
        }
    };

    let connections = state.sync.connection_count() as u32;
    let cached_owners = state.sync.cached_owner_count() as u32;
    let uptime_secs = state.started_at.elapsed().as_secs();

    // System stats
    let (cpu_usage, memory_used, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Status: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Storage: {}",
        cpu_usage,
        memory_used / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        connections,
        storage
    );

    Json(StatusResponse {
        status: "ok".to_string(),
        environment: state.config.environment.clone(),
        uptime_secs,
        connections,
        cached_owners,
        storage,
        cpu_usage,
        memory_used,
        memory_free,
        memory_total,
    })
}
