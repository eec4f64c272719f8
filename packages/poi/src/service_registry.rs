//! Compile-time POI service configuration.
//!
//! The Overpass endpoint is described in `services/overpass.toml`, which
//! is embedded at compile time and parsed on demand.

use serde::Deserialize;

/// A POI service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct PoiService {
    /// Unique identifier (e.g. `"overpass"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Interpreter endpoint URL.
    pub base_url: String,
    /// Server-side query timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

const fn default_timeout_secs() -> u64 {
    180
}

const OVERPASS_TOML: &str = include_str!("../services/overpass.toml");

/// Returns the embedded Overpass service configuration.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (covered by tests, since the
/// file is compiled in).
#[must_use]
pub fn overpass_service() -> PoiService {
    toml::de::from_str(OVERPASS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse POI service 'overpass': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_overpass_service() {
        let svc = overpass_service();
        assert_eq!(svc.id, "overpass");
        assert!(!svc.name.is_empty());
        assert!(svc.base_url.starts_with("https://"));
        assert!(svc.timeout_secs > 0);
        assert!(!svc.user_agent.is_empty());
    }
}
