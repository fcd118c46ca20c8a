//! In-memory collaborators for exercising the controllers without a store.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use pkg_state::leader::LeadershipOracle;
use pkg_state::relation::RelationTransport;
use pkg_state::secrets::SecretBackend;
use pkg_state::status::StatusSink;
use pkg_types::certificate::{CertificateRequest, ProviderCertificate};
use pkg_types::status::UnitStatus;

#[derive(Default)]
pub struct MemorySecrets {
    secrets: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
    fail_get: AtomicBool,
    fail_create: AtomicBool,
    creates: AtomicUsize,
}

impl MemorySecrets {
    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Successful `create` calls so far.
    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn insert(&self, label: &str, content: &[(&str, &str)]) {
        let content = content
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.secrets
            .lock()
            .unwrap()
            .insert(label.to_string(), content);
    }

    pub fn labels(&self) -> Vec<String> {
        self.secrets.lock().unwrap().keys().cloned().collect()
    }

    pub fn content(&self, label: &str) -> Option<BTreeMap<String, String>> {
        self.secrets.lock().unwrap().get(label).cloned()
    }
}

#[async_trait]
impl SecretBackend for MemorySecrets {
    async fn get_by_label(
        &self,
        label: &str,
        _refresh: bool,
    ) -> Result<Option<BTreeMap<String, String>>> {
        if self.fail_get.load(Ordering::SeqCst) {
            bail!("secret backend unavailable");
        }
        Ok(self.content(label))
    }

    async fn create(&self, label: &str, content: BTreeMap<String, String>) -> Result<String> {
        if self.fail_create.load(Ordering::SeqCst) {
            bail!("secret backend unavailable");
        }
        let mut secrets = self.secrets.lock().unwrap();
        if secrets.contains_key(label) {
            bail!("secret with label '{}' already exists", label);
        }
        secrets.insert(label.to_string(), content);
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(format!("secret:{}", label))
    }
}

#[derive(Default)]
pub struct MemoryRelations {
    requests: Mutex<Vec<CertificateRequest>>,
    published: Mutex<Vec<ProviderCertificate>>,
    fail_publish: Mutex<HashSet<String>>,
    fail_list: AtomicBool,
    list_calls: AtomicUsize,
}

impl MemoryRelations {
    pub fn add_request(&self, relation_id: &str, csr: &str, common_name: &str) {
        self.requests.lock().unwrap().push(CertificateRequest {
            relation_id: relation_id.to_string(),
            csr: csr.to_string(),
            common_name: common_name.to_string(),
        });
    }

    pub fn fail_publish_to(&self, relation_id: &str) {
        self.fail_publish
            .lock()
            .unwrap()
            .insert(relation_id.to_string());
    }

    pub fn clear_publish_failures(&self) {
        self.fail_publish.lock().unwrap().clear();
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<ProviderCertificate> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelationTransport for MemoryRelations {
    async fn list_outstanding_requests(
        &self,
        _integration: &str,
    ) -> Result<Vec<CertificateRequest>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            bail!("relation data unavailable");
        }
        let published = self.published.lock().unwrap();
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !published.iter().any(|p| p.csr == r.csr))
            .cloned()
            .collect())
    }

    async fn publish_certificate(
        &self,
        relation_id: &str,
        certificate: &ProviderCertificate,
    ) -> Result<()> {
        if self.fail_publish.lock().unwrap().contains(relation_id) {
            bail!("relation {} is gone", relation_id);
        }
        self.published.lock().unwrap().push(certificate.clone());
        Ok(())
    }
}

pub struct StaticLeader {
    pub leader: bool,
    pub fail: bool,
}

#[async_trait]
impl LeadershipOracle for StaticLeader {
    async fn is_leader(&self) -> Result<bool> {
        if self.fail {
            bail!("leadership oracle unavailable");
        }
        Ok(self.leader)
    }
}

#[derive(Default)]
pub struct RecordingStatus {
    statuses: Mutex<Vec<UnitStatus>>,
}

impl RecordingStatus {
    pub fn last(&self) -> Option<UnitStatus> {
        self.statuses.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl StatusSink for RecordingStatus {
    async fn set_unit_status(&self, status: &UnitStatus) -> Result<()> {
        self.statuses.lock().unwrap().push(status.clone());
        Ok(())
    }
}
