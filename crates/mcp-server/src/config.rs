//! Process configuration, read once from the environment at startup.
//!
//! Malformed numbers fall back to their defaults with a warning. Endpoints and credentials
//! are only checked when first used.

use audit_ai::generation::{DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_CLAUDE_MODEL};
use audit_ai::similarity::DEFAULT_EMBEDDING_URL;
use audit_ai::{EmbeddingConfig, GenerationConfig};
use audit_engine::connection::{DEFAULT_ENGINE_HOST, DEFAULT_ENGINE_PORT};
use audit_engine::EngineSettings;
use std::time::Duration;

pub const DEFAULT_SCAN_CONCURRENCY: usize = 8;
pub const MAX_SCAN_CONCURRENCY: usize = 64;
pub const DEFAULT_OSV_URL: &str = "https://api.osv.dev";

const DEFAULT_ENGINE_TIMEOUT_MS: u64 = 30_000;
const MIN_ENGINE_TIMEOUT_MS: u64 = 100;
const MAX_ENGINE_TIMEOUT_MS: u64 = 600_000;

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub engine: EngineSettings,
    pub scan_concurrency: usize,
    pub generation: GenerationConfig,
    pub embedding: EmbeddingConfig,
    pub osv_url: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            scan_concurrency: DEFAULT_SCAN_CONCURRENCY,
            generation: GenerationConfig::default(),
            embedding: EmbeddingConfig::default(),
            osv_url: DEFAULT_OSV_URL.to_string(),
        }
    }
}

impl AuditConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout_ms = parse_clamped(
            "CODE_AUDIT_ENGINE_TIMEOUT_MS",
            get("CODE_AUDIT_ENGINE_TIMEOUT_MS").as_deref(),
            DEFAULT_ENGINE_TIMEOUT_MS,
            MIN_ENGINE_TIMEOUT_MS,
            MAX_ENGINE_TIMEOUT_MS,
        );

        let engine = EngineSettings {
            host: get("CODE_AUDIT_ENGINE_HOST").unwrap_or_else(|| DEFAULT_ENGINE_HOST.to_string()),
            port: parse_port(get("CODE_AUDIT_ENGINE_PORT").as_deref()),
            request_timeout: Duration::from_millis(timeout_ms),
            ..EngineSettings::default()
        };

        let scan_concurrency = parse_clamped(
            "CODE_AUDIT_SCAN_CONCURRENCY",
            get("CODE_AUDIT_SCAN_CONCURRENCY").as_deref(),
            DEFAULT_SCAN_CONCURRENCY as u64,
            1,
            MAX_SCAN_CONCURRENCY as u64,
        ) as usize;

        let generation = GenerationConfig {
            api_key: get("ANTHROPIC_API_KEY"),
            model: get("CLAUDE_MODEL").unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string()),
            base_url: get("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            ..GenerationConfig::default()
        };

        let embedding = EmbeddingConfig {
            base_url: get("CODE_AUDIT_EMBEDDING_URL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_URL.to_string()),
            model: get("CODE_AUDIT_EMBEDDING_MODEL"),
            api_key: get("CODE_AUDIT_EMBEDDING_API_KEY"),
            ..EmbeddingConfig::default()
        };

        Self {
            engine,
            scan_concurrency,
            generation,
            embedding,
            osv_url: get("CODE_AUDIT_OSV_URL").unwrap_or_else(|| DEFAULT_OSV_URL.to_string()),
        }
    }
}

fn parse_port(raw: Option<&str>) -> u16 {
    match raw.map(str::parse::<u16>) {
        None => DEFAULT_ENGINE_PORT,
        Some(Ok(port)) if port != 0 => port,
        Some(_) => {
            log::warn!(
                "Ignoring invalid CODE_AUDIT_ENGINE_PORT {:?}; using {DEFAULT_ENGINE_PORT}",
                raw.unwrap_or_default()
            );
            DEFAULT_ENGINE_PORT
        }
    }
}

fn parse_clamped(key: &str, raw: Option<&str>, default_value: u64, min: u64, max: u64) -> u64 {
    let Some(raw) = raw else {
        return default_value;
    };
    match raw.parse::<u64>() {
        Ok(value) => value.clamp(min, max),
        Err(_) => {
            log::warn!("Ignoring invalid {key} {raw:?}; using {default_value}");
            default_value
        }
    }
}
