use crate::core::query::{DataParams, ElementsParams, TagsParams};
use crate::domain::model::{Plant, TimeSeriesResult};
use crate::domain::ports::PlantDataSource;
use crate::utils::error::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    pub status: &'static str,
}

/// Validates requests and delegates them to the data source.
///
/// The data source is constructed once at startup and only ever called
/// through a shared reference.
#[derive(Clone)]
pub struct Gateway {
    source: Arc<dyn PlantDataSource>,
}

impl Gateway {
    pub fn new(source: Arc<dyn PlantDataSource>) -> Self {
        Self { source }
    }

    /// Liveness only; never touches the data source.
    pub fn health(&self) -> Health {
        Health { status: "ok" }
    }

    pub async fn plants(&self) -> Result<Vec<Plant>> {
        let plants = self.source.plants().await?;
        tracing::debug!("Fetched {} plants", plants.len());
        Ok(plants)
    }

    pub async fn elements(&self, params: &ElementsParams) -> Result<Vec<serde_json::Value>> {
        let plant_id = params.plant_id()?;
        let elements = self.source.elements(plant_id).await?;
        tracing::debug!("Fetched {} elements for plant {}", elements.len(), plant_id);
        Ok(elements)
    }

    pub async fn tags(&self, params: &TagsParams) -> Result<Vec<serde_json::Value>> {
        let (plant_id, element_id) = params.ids()?;
        let tags = self.source.tags(plant_id, element_id).await?;
        tracing::debug!(
            "Fetched {} tags for plant {} element {}",
            tags.len(),
            plant_id,
            element_id
        );
        Ok(tags)
    }

    pub async fn data(&self, params: DataParams) -> Result<Vec<TimeSeriesResult>> {
        let query = params.into_query()?;
        let started = Instant::now();
        let results = self.source.data_list(&query).await?;
        let rows: usize = results.iter().map(|r| r.values.len()).sum();
        tracing::info!(
            "Fetched {} rows for {} data sources ({} .. {}, tz={}) in {:?}",
            rows,
            query.data_source_ids.len(),
            query.start_param(),
            query.end_param(),
            query.tz,
            started.elapsed()
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DataSourceQuery, ElementId, PlantId};
    use crate::utils::error::GatewayError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PlantDataSource for CountingSource {
        async fn plants(&self) -> Result<Vec<Plant>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        async fn elements(&self, plant_id: PlantId) -> Result<Vec<serde_json::Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![serde_json::json!({ "PlantId": plant_id })])
        }

        async fn tags(&self, _: PlantId, _: ElementId) -> Result<Vec<serde_json::Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        async fn data_list(&self, query: &DataSourceQuery) -> Result<Vec<TimeSeriesResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(query
                .data_source_ids
                .iter()
                .map(|id| TimeSeriesResult {
                    data_source_id: *id,
                    values: vec![],
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_invalid_params_never_reach_source() {
        let source = Arc::new(CountingSource::default());
        let gateway = Gateway::new(source.clone());

        let err = gateway.elements(&ElementsParams::default()).await.unwrap_err();
        assert!(matches!(err, GatewayError::ValidationError { .. }));

        let params = DataParams {
            data_source_ids: Some("1".to_string()),
            start: Some("2025-10-02".to_string()),
            end: Some("2025-10-01".to_string()),
            ..DataParams::default()
        };
        assert!(gateway.data(params).await.is_err());

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_request_is_delegated() {
        let source = Arc::new(CountingSource::default());
        let gateway = Gateway::new(source.clone());

        let params = ElementsParams {
            plant_id: Some("17".to_string()),
        };
        let elements = gateway.elements(&params).await.unwrap();
        assert_eq!(elements[0]["PlantId"], 17);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_health_is_fixed() {
        let gateway = Gateway::new(Arc::new(CountingSource::default()));
        assert_eq!(gateway.health(), Health { status: "ok" });
    }
}
