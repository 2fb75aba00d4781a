//! Worker and cache configuration, loaded from TOML.
//!
//! Example:
//! ```toml
//! tip_ttl_secs = 3600
//! worker_shards = 4
//! queue_depth = 1024
//! append_max_attempts = 3
//! append_backoff_ms = 50
//! ```
//!
//! Every field has a production default, so an empty document is a valid
//! configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use carelog_contracts::error::{AuditError, AuditResult};

/// Tuning knobs for the append worker pool and the tip cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// How long a cached chain tip stays valid.  This bounds the window in
    /// which a crash between durable append and cache update can leave the
    /// cache stale.
    #[serde(default = "default_tip_ttl_secs")]
    pub tip_ttl_secs: u64,

    /// Number of shard threads in the worker pool.  Each tenant is hashed to
    /// exactly one shard, so per-tenant processing stays strictly
    /// sequential.  `1` reproduces a single global writer.
    #[serde(default = "default_worker_shards")]
    pub worker_shards: usize,

    /// Bounded depth of each shard's event queue.  Producers block once a
    /// shard's queue is full (backpressure, not loss).
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// How many times a failed durable append is attempted before the event
    /// is dropped as a trail gap.
    #[serde(default = "default_append_max_attempts")]
    pub append_max_attempts: u32,

    /// Base backoff between append attempts; attempt *n* waits n × this.
    #[serde(default = "default_append_backoff_ms")]
    pub append_backoff_ms: u64,
}

fn default_tip_ttl_secs() -> u64 {
    3600
}
fn default_worker_shards() -> usize {
    4
}
fn default_queue_depth() -> usize {
    1024
}
fn default_append_max_attempts() -> u32 {
    3
}
fn default_append_backoff_ms() -> u64 {
    50
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            tip_ttl_secs: default_tip_ttl_secs(),
            worker_shards: default_worker_shards(),
            queue_depth: default_queue_depth(),
            append_max_attempts: default_append_max_attempts(),
            append_backoff_ms: default_append_backoff_ms(),
        }
    }
}

impl AuditConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `AuditError::ConfigError` if the TOML is malformed, contains
    /// unknown fields, or fails validation.
    pub fn from_toml_str(s: &str) -> AuditResult<Self> {
        let config: AuditConfig = toml::from_str(s).map_err(|e| AuditError::ConfigError {
            reason: format!("failed to parse audit config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> AuditResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AuditError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The tip TTL as a `Duration`.
    pub fn tip_ttl(&self) -> Duration {
        Duration::from_secs(self.tip_ttl_secs)
    }

    fn validate(&self) -> AuditResult<()> {
        if self.worker_shards == 0 {
            return Err(AuditError::ConfigError {
                reason: "worker_shards must be at least 1".to_string(),
            });
        }
        if self.queue_depth == 0 {
            return Err(AuditError::ConfigError {
                reason: "queue_depth must be at least 1".to_string(),
            });
        }
        if self.append_max_attempts == 0 {
            return Err(AuditError::ConfigError {
                reason: "append_max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
