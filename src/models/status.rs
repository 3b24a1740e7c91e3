use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for runtime status information
#[derive(Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub environment: String,
    pub uptime_secs: u64,
    /// Live session count across all owners.
    pub connections: u32,
    /// Owners with a cached last-known text; observability only.
    pub cached_owners: u32,
    /// "reachable" or "unreachable", probed with a read of the newest note.
    pub storage: String,
    pub cpu_usage: f32,
    pub memory_used: u64,
    pub memory_free: u64,
    pub memory_total: u64,
}
