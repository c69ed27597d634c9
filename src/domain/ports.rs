use crate::domain::model::{DataSourceQuery, ElementId, Plant, PlantId, TimeSeriesResult};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Read-only view of the plant data source the HTTP layer delegates to.
#[async_trait]
pub trait PlantDataSource: Send + Sync {
    async fn plants(&self) -> Result<Vec<Plant>>;
    async fn elements(&self, plant_id: PlantId) -> Result<Vec<serde_json::Value>>;
    async fn tags(&self, plant_id: PlantId, element_id: ElementId)
        -> Result<Vec<serde_json::Value>>;
    /// One result per requested identifier, in request order.
    async fn data_list(&self, query: &DataSourceQuery) -> Result<Vec<TimeSeriesResult>>;
}
