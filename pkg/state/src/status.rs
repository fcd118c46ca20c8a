use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::client::StateStore;
use pkg_constants::state::UNITS_PREFIX;
use pkg_types::status::{UnitStatus, UnitStatusRecord};

/// Where the orchestrator reports the unit's workload status.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn set_unit_status(&self, status: &UnitStatus) -> Result<()>;
}

/// [`StatusSink`] that records the status of one unit in the state store.
#[derive(Clone)]
pub struct StoreStatus {
    store: StateStore,
    unit: String,
}

impl StoreStatus {
    pub fn new(store: StateStore, unit: impl Into<String>) -> Self {
        Self {
            store,
            unit: unit.into(),
        }
    }

    fn key(&self) -> String {
        format!("{}{}/status", UNITS_PREFIX, self.unit)
    }

    /// Last status reported by this unit, if any.
    pub async fn unit_status(&self) -> Result<Option<UnitStatusRecord>> {
        self.store.get_json(&self.key()).await
    }
}

#[async_trait]
impl StatusSink for StoreStatus {
    async fn set_unit_status(&self, status: &UnitStatus) -> Result<()> {
        let record = UnitStatusRecord {
            unit: self.unit.clone(),
            status: status.clone(),
            updated_at: Utc::now(),
        };
        self.store.put_json(&self.key(), &record).await?;
        info!("Unit {} status set to {} {}", self.unit, status.name, status.message);
        Ok(())
    }
}
