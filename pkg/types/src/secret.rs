use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pkg_constants::secrets::{CA_CERTIFICATE_FIELD, PRIVATE_KEY_FIELD};

/// A labelled secret as persisted by the secret backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub id: String,
    pub label: String,
    /// Secret content as a loosely-typed key/value map.
    pub content: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Root CA certificate and its private key, both PEM-encoded.
///
/// Either absent from the store or present as a complete pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaMaterial {
    pub ca_certificate: String,
    pub private_key: String,
}

impl CaMaterial {
    /// Build typed material from secret content, failing if a field is missing or empty.
    pub fn from_content(content: &BTreeMap<String, String>) -> anyhow::Result<Self> {
        let private_key = content
            .get(PRIVATE_KEY_FIELD)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow::anyhow!("could not find CA private key in secret"))?;
        let ca_certificate = content
            .get(CA_CERTIFICATE_FIELD)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow::anyhow!("could not find CA certificate in secret"))?;

        Ok(Self {
            ca_certificate: ca_certificate.clone(),
            private_key: private_key.clone(),
        })
    }

    /// Flatten into the content map stored under the CA secret label.
    pub fn to_content(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (PRIVATE_KEY_FIELD.to_string(), self.private_key.clone()),
            (CA_CERTIFICATE_FIELD.to_string(), self.ca_certificate.clone()),
        ])
    }
}
