//! Deployment configuration

pub mod config;

pub use config::{
    BeaconConfig, ConfigError, ConfigResult, ConfigurationManager, DeploymentConfig,
    FusionConfig, SinkConfig, StationConfig, ValidationResult,
};
