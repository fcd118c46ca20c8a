use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::client::StateStore;
use pkg_constants::state::{PROVIDER_BAG, RELATIONS_PREFIX, REQUIRER_BAG};
use pkg_pki::inspect::csr_common_name;
use pkg_types::certificate::{
    CertificateRequest, ProviderCertificate, ProviderData, RequirerData,
};

/// Channel carrying CSRs in and issued certificates out.
#[async_trait]
pub trait RelationTransport: Send + Sync {
    /// CSRs on `integration` that have no published certificate yet, in transport order.
    async fn list_outstanding_requests(&self, integration: &str)
    -> Result<Vec<CertificateRequest>>;

    /// Publish `certificate` to the peer on `relation_id`.
    async fn publish_certificate(
        &self,
        relation_id: &str,
        certificate: &ProviderCertificate,
    ) -> Result<()>;
}

/// [`RelationTransport`] over per-relation data bags in the state store.
///
/// The requiring peer writes its CSRs to the requirer bag; the operator
/// answers in the provider bag. A CSR is outstanding while no provider
/// certificate echoes it.
#[derive(Clone)]
pub struct StoreRelations {
    store: StateStore,
}

impl StoreRelations {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    fn bag_key(relation_id: &str, bag: &str) -> String {
        format!("{}{}/{}", RELATIONS_PREFIX, relation_id, bag)
    }

    /// Requirer side: add `csr` to the relation's requests, creating the relation if needed.
    pub async fn submit_request(&self, relation_id: &str, integration: &str, csr: &str) -> Result<()> {
        if relation_id.is_empty() || relation_id.contains('/') {
            bail!("invalid relation id '{}'", relation_id);
        }

        let key = Self::bag_key(relation_id, REQUIRER_BAG);
        let mut data: RequirerData = self.store.get_json(&key).await?.unwrap_or_default();
        if !data.integration.is_empty() && data.integration != integration {
            bail!(
                "relation {} belongs to integration '{}', not '{}'",
                relation_id,
                data.integration,
                integration
            );
        }
        data.integration = integration.to_string();

        if data.requests.iter().any(|r| r.trim() == csr.trim()) {
            info!("Request already present on relation {}", relation_id);
            return Ok(());
        }
        data.requests.push(csr.to_string());
        self.store.put_json(&key, &data).await
    }

    /// Requirer side: certificates published on `relation_id` so far.
    pub async fn published_certificates(&self, relation_id: &str) -> Result<Vec<ProviderCertificate>> {
        let data: ProviderData = self
            .store
            .get_json(&Self::bag_key(relation_id, PROVIDER_BAG))
            .await?
            .unwrap_or_default();
        Ok(data.certificates)
    }
}

#[async_trait]
impl RelationTransport for StoreRelations {
    async fn list_outstanding_requests(
        &self,
        integration: &str,
    ) -> Result<Vec<CertificateRequest>> {
        let mut relations: BTreeMap<String, (Option<RequirerData>, ProviderData)> = BTreeMap::new();

        for (key, value) in self.store.list_prefix(RELATIONS_PREFIX).await? {
            let Some((relation_id, bag)) = key
                .strip_prefix(RELATIONS_PREFIX)
                .and_then(|rest| rest.rsplit_once('/'))
            else {
                continue;
            };
            let entry = relations.entry(relation_id.to_string()).or_default();

            match bag {
                REQUIRER_BAG => match serde_json::from_slice(&value) {
                    Ok(data) => entry.0 = Some(data),
                    Err(e) => warn!("Skipping unreadable requirer data on {}: {}", relation_id, e),
                },
                PROVIDER_BAG => match serde_json::from_slice(&value) {
                    Ok(data) => entry.1 = data,
                    Err(e) => warn!("Ignoring unreadable provider data on {}: {}", relation_id, e),
                },
                _ => {}
            }
        }

        let mut outstanding = Vec::new();
        for (relation_id, (requirer, provider)) in relations {
            let Some(requirer) = requirer else { continue };
            if requirer.integration != integration {
                continue;
            }
            for csr in requirer.requests {
                if provider.answers(&csr) {
                    continue;
                }
                outstanding.push(CertificateRequest {
                    relation_id: relation_id.clone(),
                    common_name: csr_common_name(&csr).unwrap_or_default(),
                    csr,
                });
            }
        }
        Ok(outstanding)
    }

    async fn publish_certificate(
        &self,
        relation_id: &str,
        certificate: &ProviderCertificate,
    ) -> Result<()> {
        if self
            .store
            .get(&Self::bag_key(relation_id, REQUIRER_BAG))
            .await?
            .is_none()
        {
            bail!("relation {} not found", relation_id);
        }

        let key = Self::bag_key(relation_id, PROVIDER_BAG);
        let mut data: ProviderData = self.store.get_json(&key).await?.unwrap_or_default();
        data.upsert(certificate.clone());
        self.store.put_json(&key, &data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DnType, KeyPair};

    fn make_csr(cn: &str) -> String {
        let mut params = CertificateParams::new(vec![cn.to_string()]).unwrap();
        params.distinguished_name.push(DnType::CommonName, cn);
        let key = KeyPair::generate().unwrap();
        params.serialize_request(&key).unwrap().pem().unwrap()
    }

    async fn open() -> (tempfile::TempDir, StoreRelations) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().to_str().unwrap()).await.unwrap();
        (dir, StoreRelations::new(store))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_outstanding_until_published() {
        let (_dir, relations) = open().await;
        let csr = make_csr("example.com");
        relations
            .submit_request("certificates:1", "certificates", &csr)
            .await
            .unwrap();

        let outstanding = relations.list_outstanding_requests("certificates").await.unwrap();
        assert_eq!(outstanding.len(), 1);
        assert_eq!(outstanding[0].relation_id, "certificates:1");
        assert_eq!(outstanding[0].common_name, "example.com");

        let cert = ProviderCertificate::issued(&outstanding[0], "LEAF".to_string(), "CA");
        relations
            .publish_certificate("certificates:1", &cert)
            .await
            .unwrap();

        assert!(
            relations
                .list_outstanding_requests("certificates")
                .await
                .unwrap()
                .is_empty()
        );
        let published = relations.published_certificates("certificates:1").await.unwrap();
        assert_eq!(published, vec![cert]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_other_integrations_ignored() {
        let (_dir, relations) = open().await;
        relations
            .submit_request("metrics:4", "metrics", &make_csr("grafana.local"))
            .await
            .unwrap();
        relations
            .submit_request("certificates:2", "certificates", &make_csr("a.example.com"))
            .await
            .unwrap();

        let outstanding = relations.list_outstanding_requests("certificates").await.unwrap();
        assert_eq!(outstanding.len(), 1);
        assert_eq!(outstanding[0].relation_id, "certificates:2");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_publish_to_unknown_relation_fails() {
        let (_dir, relations) = open().await;
        let request = CertificateRequest {
            relation_id: "certificates:9".to_string(),
            csr: "CSR".to_string(),
            common_name: String::new(),
        };
        let cert = ProviderCertificate::issued(&request, "LEAF".to_string(), "CA");
        assert!(
            relations
                .publish_certificate("certificates:9", &cert)
                .await
                .is_err()
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_listing_fails_when_store_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        let store = StateStore::new(path).await.unwrap();
        let relations = StoreRelations::new(store);
        relations
            .submit_request("certificates:1", "certificates", &make_csr("example.com"))
            .await
            .unwrap();

        // A newer client fences this one; reads must error rather than come back empty.
        let _newer = StateStore::new(path).await.unwrap();
        assert!(
            relations
                .list_outstanding_requests("certificates")
                .await
                .is_err()
        );
    }
}
