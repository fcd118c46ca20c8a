use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::client::StateStore;

use pkg_constants::state::{LEADER_LEASE_ID, LEADER_LEASE_KEY, LEADER_LEASE_TTL_SECS};

/// Answers whether the invoking unit is the designated leader right now.
#[async_trait]
pub trait LeadershipOracle: Send + Sync {
    async fn is_leader(&self) -> Result<bool>;
}

/// A distributed lease for leader election.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub id: String,
    pub holder_id: String,
    pub acquired_at: chrono::DateTime<Utc>,
    pub renew_at: chrono::DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl Lease {
    pub fn is_expired(&self) -> bool {
        let expiry = self.renew_at + chrono::Duration::seconds(self.ttl_seconds as i64);
        Utc::now() > expiry
    }
}

/// Leader election over a SlateDB lease.
///
/// Each leadership check acquires a free or expired lease, or renews one this
/// unit already holds. A unit keeps leadership as long as it is invoked more
/// often than the lease TTL.
pub struct LeaderElection {
    store: StateStore,
    unit_name: String,
    ttl: Duration,
}

impl LeaderElection {
    pub fn new(store: StateStore, unit_name: impl Into<String>) -> Self {
        Self {
            store,
            unit_name: unit_name.into(),
            ttl: Duration::from_secs(LEADER_LEASE_TTL_SECS),
        }
    }

    /// Current lease, whoever holds it.
    pub async fn current_lease(&self) -> Result<Option<Lease>> {
        self.store.get_json(LEADER_LEASE_KEY).await
    }

    fn new_lease(&self) -> Lease {
        let now = Utc::now();
        Lease {
            id: LEADER_LEASE_ID.to_string(),
            holder_id: self.unit_name.clone(),
            acquired_at: now,
            renew_at: now,
            ttl_seconds: self.ttl.as_secs(),
        }
    }

    /// Try to acquire or renew the lease. Returns true if we are the leader.
    async fn try_acquire_or_renew(&self) -> Result<bool> {
        match self.current_lease().await? {
            Some(lease) if lease.holder_id == self.unit_name => {
                let renewed = Lease {
                    renew_at: Utc::now(),
                    ..lease
                };
                self.store.put_json(LEADER_LEASE_KEY, &renewed).await?;
                debug!("Lease renewed for {}", self.unit_name);
                Ok(true)
            }
            Some(lease) if lease.is_expired() => {
                info!(
                    "Lease expired (held by {}), acquiring for {}",
                    lease.holder_id, self.unit_name
                );
                self.store.put_json(LEADER_LEASE_KEY, &self.new_lease()).await?;
                Ok(true)
            }
            Some(lease) => {
                debug!("Lease held by {}", lease.holder_id);
                Ok(false)
            }
            None => {
                info!("No existing lease found, acquiring for {}", self.unit_name);
                self.store.put_json(LEADER_LEASE_KEY, &self.new_lease()).await?;
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl LeadershipOracle for LeaderElection {
    async fn is_leader(&self) -> Result<bool> {
        self.try_acquire_or_renew().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_first_unit_wins_lease() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().to_str().unwrap()).await.unwrap();

        let first = LeaderElection::new(store.clone(), "ca/0");
        let second = LeaderElection::new(store.clone(), "ca/1");

        assert!(first.is_leader().await.unwrap());
        assert!(!second.is_leader().await.unwrap());
        // Renewal keeps the lease with the holder.
        assert!(first.is_leader().await.unwrap());
        assert_eq!(first.current_lease().await.unwrap().unwrap().holder_id, "ca/0");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expired_lease_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().to_str().unwrap()).await.unwrap();

        let stale = Lease {
            id: LEADER_LEASE_ID.to_string(),
            holder_id: "ca/0".to_string(),
            acquired_at: Utc::now() - chrono::Duration::minutes(10),
            renew_at: Utc::now() - chrono::Duration::minutes(10),
            ttl_seconds: LEADER_LEASE_TTL_SECS,
        };
        assert!(stale.is_expired());
        store.put_json(LEADER_LEASE_KEY, &stale).await.unwrap();

        let election = LeaderElection::new(store, "ca/1");
        assert!(election.is_leader().await.unwrap());
        assert_eq!(election.current_lease().await.unwrap().unwrap().holder_id, "ca/1");
    }
}
