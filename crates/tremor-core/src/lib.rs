//! Core types, configuration, and error handling for tremor.
//!
//! This crate provides the shared foundation used by the analyzer crates:
//! - [`TremorError`]: unified error type using `thiserror` and `miette`
//! - [`TremorConfig`]: configuration loaded from `.tremor.toml`
//! - Shared types: [`Identity`], [`RiskLevel`], [`ArchLayer`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    BusFactorConfig, ChurnConfig, CouplingConfig, GraphConfig, HistoryConfig, HotspotThreshold,
    HotspotThresholds, LayersConfig, TremorConfig,
};
pub use error::TremorError;
pub use types::{author_key, ArchLayer, Identity, OutputFormat, RiskLevel};

/// A convenience `Result` type for tremor operations.
pub type Result<T> = std::result::Result<T, TremorError>;
