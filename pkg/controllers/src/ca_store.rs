use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use pkg_constants::secrets::CA_CERTIFICATE_SECRET_LABEL;
use pkg_pki::ca::generate_root_certificate;
use pkg_state::secrets::SecretBackend;
use pkg_types::secret::CaMaterial;
use pkg_types::subject::SubjectConfig;

/// What `ensure_root_certificate` found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// CA material was already stored; nothing was generated.
    Existing,
    /// No CA material existed; a new root was generated and stored.
    Created,
}

/// Typed get-or-create access to the CA material secret.
///
/// There is no lock around the get-then-create sequence: only the elected
/// leader may call [`CaMaterialStore::ensure_root_certificate`].
#[derive(Clone)]
pub struct CaMaterialStore {
    secrets: Arc<dyn SecretBackend>,
}

impl CaMaterialStore {
    pub fn new(secrets: Arc<dyn SecretBackend>) -> Self {
        Self { secrets }
    }

    /// Refreshed read of the CA material. `None` if it has never been created.
    pub async fn get(&self) -> anyhow::Result<Option<CaMaterial>> {
        let content = self
            .secrets
            .get_by_label(CA_CERTIFICATE_SECRET_LABEL, true)
            .await
            .context("could not get CA certificate secret")?;

        content
            .map(|content| CaMaterial::from_content(&content))
            .transpose()
    }

    /// Create the root CA unless one is already stored.
    ///
    /// If storing fails the generated material is dropped; the next call
    /// starts over from "not found".
    pub async fn ensure_root_certificate(
        &self,
        subject: &SubjectConfig,
    ) -> anyhow::Result<EnsureOutcome> {
        if self.get().await?.is_some() {
            info!("CA certificate secret found");
            return Ok(EnsureOutcome::Existing);
        }

        let (ca_certificate, private_key) =
            generate_root_certificate(subject).context("could not generate root certificate")?;
        info!("Generated new root certificate");

        let material = CaMaterial {
            ca_certificate,
            private_key,
        };
        let id = self
            .secrets
            .create(CA_CERTIFICATE_SECRET_LABEL, material.to_content())
            .await
            .context("could not add CA certificate secret")?;

        info!("Created CA certificate secret {}", id);
        Ok(EnsureOutcome::Created)
    }
}
