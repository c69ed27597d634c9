pub mod gateway;
pub mod query;

pub use crate::domain::model::{DataSourceQuery, Plant, TimeSeriesResult};
pub use crate::domain::ports::PlantDataSource;
pub use crate::utils::error::Result;
