//! # DAMM Configuration
//!
//! Centralized parameters for the DAMM engine: the solvency floor enforced
//! on every synchronization, the numeric tolerances used by the pool and
//! aggregator math, and the logging setup.
//!
//! ## Features
//!
//! - **Defaults**: compile-time constants for every parameter
//! - **Settings**: `DammConfig`, loadable from TOML with environment overrides
//! - **Telemetry**: `tracing` subscriber installation
//!
//! ## Usage
//!
//! ```rust
//! use damm_config::{defaults, DammConfig};
//!
//! let config = DammConfig::default();
//! assert_eq!(config.solvency.min_health_factor, defaults::solvency::MIN_HEALTH_FACTOR);
//! config.validate().expect("defaults are valid");
//! ```

pub mod defaults;
pub mod settings;
pub mod telemetry;

// Re-export commonly used types
pub use settings::{load_config, DammConfig, LoggingSettings, SolvencySettings, ToleranceSettings};
pub use telemetry::init_tracing;
