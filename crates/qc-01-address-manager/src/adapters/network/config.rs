use crate::domain::AddressManagerConfig;
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - Hardcoded config for testing/development
// ============================================================================

/// Static configuration provider with hardcoded values.
///
/// Useful for testing and development. For production, use `TomlConfigProvider`.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: AddressManagerConfig,
}

impl StaticConfigProvider {
    /// Create with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with specified address manager config.
    #[must_use]
    pub fn with_config(mut self, config: AddressManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable the invariant checker.
    #[must_use]
    pub fn with_consistency_checks(mut self, enabled: bool) -> Self {
        self.config.consistency_checks = enabled;
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn address_manager_config(&self) -> AddressManagerConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider - Production Config Loading (requires "toml-config" feature)
// ============================================================================

#[cfg(feature = "toml-config")]
mod toml_config {
    use super::*;
    use crate::error::ConfigError;
    use serde::Deserialize;
    use std::fs;
    use std::path::Path;

    /// Configuration file structure.
    #[derive(Debug, Deserialize)]
    struct ConfigFile {
        #[serde(default)]
        address_manager: AddressManagerConfigFile,
    }

    #[derive(Debug, Deserialize, Default)]
    struct AddressManagerConfigFile {
        horizon_days: Option<u64>,
        retry_limit: Option<u32>,
        max_failures: Option<u32>,
        min_fail_days: Option<u64>,
        getaddr_max: Option<usize>,
        getaddr_max_pct: Option<usize>,
        consistency_checks: Option<bool>,
    }

    /// TOML-based configuration provider.
    ///
    /// Loads address manager configuration from a TOML file. Every key is
    /// optional; missing keys keep their defaults.
    ///
    /// # Config File Format
    ///
    /// ```toml
    /// [address_manager]
    /// horizon_days = 30
    /// retry_limit = 3
    /// max_failures = 10
    /// min_fail_days = 7
    /// getaddr_max = 2500
    /// getaddr_max_pct = 23
    /// consistency_checks = false
    /// ```
    #[derive(Debug, Clone)]
    pub struct TomlConfigProvider {
        config: AddressManagerConfig,
    }

    impl TomlConfigProvider {
        /// Load configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// Returns error if file cannot be read, parsed or validated.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref())?;
            Self::parse(&content)
        }

        /// Parse configuration from a TOML string.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

            let am = file.address_manager;
            let defaults = AddressManagerConfig::default();
            let config = AddressManagerConfig {
                horizon_days: am.horizon_days.unwrap_or(defaults.horizon_days),
                retry_limit: am.retry_limit.unwrap_or(defaults.retry_limit),
                max_failures: am.max_failures.unwrap_or(defaults.max_failures),
                min_fail_days: am.min_fail_days.unwrap_or(defaults.min_fail_days),
                getaddr_max: am.getaddr_max.unwrap_or(defaults.getaddr_max),
                getaddr_max_pct: am.getaddr_max_pct.unwrap_or(defaults.getaddr_max_pct),
                consistency_checks: am.consistency_checks.unwrap_or(defaults.consistency_checks),
            };

            if !(1..=100).contains(&config.getaddr_max_pct) {
                return Err(ConfigError::Invalid {
                    key: "getaddr_max_pct",
                    reason: format!("{} is not within 1..=100", config.getaddr_max_pct),
                });
            }

            Ok(Self { config })
        }
    }

    impl ConfigProvider for TomlConfigProvider {
        fn address_manager_config(&self) -> AddressManagerConfig {
            self.config.clone()
        }
    }
}

#[cfg(feature = "toml-config")]
pub use toml_config::TomlConfigProvider;
