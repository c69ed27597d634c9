pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::{CliConfig, LogFormat};

pub use crate::adapters::GpmClient;
pub use crate::app::{router, run_http};
pub use crate::config::GpmSettings;
pub use crate::core::gateway::Gateway;
pub use crate::domain::model::{DataSourceQuery, Plant, TimeSeriesResult, TimeZoneName};
pub use crate::domain::ports::PlantDataSource;
pub use crate::utils::error::{GatewayError, Result};
