//! Engine Settings Module
//!
//! Provides configuration loading for the DAMM engine.
//! Supports loading from TOML files with environment-specific overrides.

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default location of the base configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/damm.toml";

/// Directory holding `<environment>.toml` overlays
pub const ENVIRONMENTS_DIR: &str = "config/environments";

/// Prefix for environment variable overrides (`DAMM_SOLVENCY__MIN_HEALTH_FACTOR`)
pub const ENV_PREFIX: &str = "DAMM";

/// Main engine configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DammConfig {
    /// Solvency floor enforced by the aggregator
    pub solvency: SolvencySettings,

    /// Numeric tolerances used by pool and aggregator math
    pub tolerances: ToleranceSettings,

    /// Logging setup
    pub logging: LoggingSettings,
}

/// Health factor limits checked at the end of every synchronization
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SolvencySettings {
    pub min_health_factor: Decimal,
    pub max_health_factor_drop_per_sync: Decimal,
}

/// Tolerances for the floating comparisons in join and synchronize
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ToleranceSettings {
    pub join_ratio: Decimal,
    pub invariant: Decimal,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `"info"` or `"damm=debug"`
    pub level: String,
    pub with_target: bool,
}

impl Default for SolvencySettings {
    fn default() -> Self {
        Self {
            min_health_factor: defaults::solvency::MIN_HEALTH_FACTOR,
            max_health_factor_drop_per_sync: defaults::solvency::MAX_HEALTH_FACTOR_DROP_PER_SYNC,
        }
    }
}

impl Default for ToleranceSettings {
    fn default() -> Self {
        Self {
            join_ratio: defaults::tolerances::JOIN_RATIO_TOLERANCE,
            invariant: defaults::tolerances::INVARIANT_TOLERANCE,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::logging::DEFAULT_LOG_LEVEL.to_string(),
            with_target: false,
        }
    }
}

impl DammConfig {
    /// Load configuration from files with environment overrides
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let base = base_path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));

        let mut builder = Config::builder().add_source(File::from(base).required(true));

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base
                .parent()
                .map(|dir| dir.join("environments"))
                .unwrap_or_else(|| PathBuf::from(ENVIRONMENTS_DIR))
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (DAMM_ prefix, "__" between sections)
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let settings: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        debug!(?settings, "Loaded DAMM configuration");
        Ok(settings)
    }

    /// Reject parameter combinations the engine cannot operate under
    pub fn validate(&self) -> Result<()> {
        if self.solvency.min_health_factor <= Decimal::ZERO {
            bail!(
                "min_health_factor must be positive, got {}",
                self.solvency.min_health_factor
            );
        }
        if self.solvency.max_health_factor_drop_per_sync < Decimal::ZERO {
            bail!(
                "max_health_factor_drop_per_sync cannot be negative, got {}",
                self.solvency.max_health_factor_drop_per_sync
            );
        }
        if self.tolerances.join_ratio <= Decimal::ZERO {
            bail!("join_ratio tolerance must be positive, got {}", self.tolerances.join_ratio);
        }
        if self.tolerances.invariant <= Decimal::ZERO {
            bail!("invariant tolerance must be positive, got {}", self.tolerances.invariant);
        }
        if self.logging.level.trim().is_empty() {
            bail!("logging level cannot be empty");
        }
        Ok(())
    }
}

/// Convenience function to load and validate configuration from the default path
pub fn load_config(environment: Option<&str>) -> Result<DammConfig> {
    let config = DammConfig::load(None, environment)?;
    config.validate()?;
    Ok(config)
}
