use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub compute: ComputeConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `LOADCALC_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("LOADCALC_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            compute: ComputeConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject settings that would make the compute contract unsatisfiable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compute.validate()
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        let c = &self.compute;
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  complexity:  [{}, {}], default={}, invalid={}",
            c.min_complexity, c.max_complexity, c.default_complexity, c.invalid_policy
        );
        tracing::info!(
            "  workload:    base_size={}, pause=[{}, {})ms",
            c.base_size,
            c.min_sleep_ms,
            c.min_sleep_ms.saturating_add(c.max_additional_sleep_ms)
        );
        tracing::info!("  pool:        max_blocking_threads={}", c.max_blocking_threads);
    }

    /// Return a JSON view for API responses.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "compute": self.compute,
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "PORT", 8080),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Compute ───────────────────────────────────────────────────

/// What to do with a complexity value that is present but unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityPolicy {
    /// Answer with a validation error naming the allowed range.
    #[default]
    Reject,
    /// Substitute the default complexity and log a warning.
    Fallback,
}

impl FromStr for ComplexityPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "fallback" | "default" => Ok(Self::Fallback),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for ComplexityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Tunables for the synthetic workload and the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Buffer entries every job allocates regardless of complexity.
    pub base_size: usize,
    /// Lower bound of the simulated I/O pause.
    pub min_sleep_ms: u64,
    /// Width of the pause window above `min_sleep_ms` (exclusive).
    pub max_additional_sleep_ms: u64,
    pub default_complexity: u32,
    pub min_complexity: u32,
    pub max_complexity: u32,
    pub invalid_policy: ComplexityPolicy,
    /// Upper bound on blocking worker threads.
    pub max_blocking_threads: usize,
}

pub const DEFAULT_BASE_SIZE: usize = 10_000;
pub const DEFAULT_MIN_SLEEP_MS: u64 = 100;
pub const DEFAULT_MAX_ADDITIONAL_SLEEP_MS: u64 = 400;
pub const DEFAULT_COMPLEXITY: u32 = 50_000;
pub const MIN_COMPLEXITY: u32 = 1;
pub const MAX_COMPLEXITY: u32 = 1_000_000;
pub const DEFAULT_MAX_BLOCKING_THREADS: usize = 512;

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            base_size: DEFAULT_BASE_SIZE,
            min_sleep_ms: DEFAULT_MIN_SLEEP_MS,
            max_additional_sleep_ms: DEFAULT_MAX_ADDITIONAL_SLEEP_MS,
            default_complexity: DEFAULT_COMPLEXITY,
            min_complexity: MIN_COMPLEXITY,
            max_complexity: MAX_COMPLEXITY,
            invalid_policy: ComplexityPolicy::Reject,
            max_blocking_threads: DEFAULT_MAX_BLOCKING_THREADS,
        }
    }
}

impl ComputeConfig {
    fn from_env_profiled(p: &str) -> Self {
        let invalid_policy = match profiled_env_opt(p, "COMPUTE_INVALID_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, using '{}'", e, ComplexityPolicy::default());
                ComplexityPolicy::default()
            }),
            None => ComplexityPolicy::default(),
        };
        Self {
            base_size: profiled_env_parse(p, "COMPUTE_BASE_SIZE", DEFAULT_BASE_SIZE),
            min_sleep_ms: profiled_env_parse(p, "COMPUTE_MIN_SLEEP_MS", DEFAULT_MIN_SLEEP_MS),
            max_additional_sleep_ms: profiled_env_parse(
                p,
                "COMPUTE_MAX_ADDITIONAL_SLEEP_MS",
                DEFAULT_MAX_ADDITIONAL_SLEEP_MS,
            ),
            default_complexity: profiled_env_parse(p, "COMPUTE_DEFAULT_COMPLEXITY", DEFAULT_COMPLEXITY),
            min_complexity: MIN_COMPLEXITY,
            max_complexity: profiled_env_parse(p, "COMPUTE_MAX_COMPLEXITY", MAX_COMPLEXITY),
            invalid_policy,
            max_blocking_threads: profiled_env_parse(
                p,
                "COMPUTE_MAX_BLOCKING_THREADS",
                DEFAULT_MAX_BLOCKING_THREADS,
            ),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_complexity < self.min_complexity {
            return Err(ConfigError::EmptyComplexityRange {
                min: self.min_complexity,
                max: self.max_complexity,
            });
        }
        if !(self.min_complexity..=self.max_complexity).contains(&self.default_complexity) {
            return Err(ConfigError::DefaultOutOfRange {
                value: self.default_complexity,
                min: self.min_complexity,
                max: self.max_complexity,
            });
        }
        if self.max_additional_sleep_ms == 0 {
            return Err(ConfigError::Zero("max_additional_sleep_ms"));
        }
        if self.min_sleep_ms.checked_add(self.max_additional_sleep_ms).is_none() {
            return Err(ConfigError::PauseOverflow {
                min_ms: self.min_sleep_ms,
                additional_ms: self.max_additional_sleep_ms,
            });
        }
        if self.max_blocking_threads == 0 {
            return Err(ConfigError::Zero("max_blocking_threads"));
        }
        Ok(())
    }
}
