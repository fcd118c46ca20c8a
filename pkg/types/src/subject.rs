use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::ConfigSource;
use pkg_constants::config::{
    CA_COMMON_NAME, CA_COUNTRY_NAME, CA_EMAIL_ADDRESS, CA_LOCALITY_NAME, CA_ORGANIZATION,
    CA_ORGANIZATIONAL_UNIT, CA_STATE_OR_PROVINCE_NAME,
};

/// Subject attributes of the root CA certificate.
///
/// Rebuilt from the config source on every invocation. Only `common_name`
/// is required; empty optional fields are left out of the certificate subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfig {
    pub common_name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub organizational_unit: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub country_name: String,
    #[serde(default)]
    pub state_or_province_name: String,
    #[serde(default)]
    pub locality_name: String,
}

impl SubjectConfig {
    /// Read every subject field from `source`. Missing keys read as empty.
    pub fn load(source: &dyn ConfigSource) -> Self {
        Self {
            common_name: source.get(CA_COMMON_NAME),
            organization: source.get(CA_ORGANIZATION),
            organizational_unit: source.get(CA_ORGANIZATIONAL_UNIT),
            email_address: source.get(CA_EMAIL_ADDRESS),
            country_name: source.get(CA_COUNTRY_NAME),
            state_or_province_name: source.get(CA_STATE_OR_PROVINCE_NAME),
            locality_name: source.get(CA_LOCALITY_NAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.common_name.is_empty() {
            bail!("{} config is empty", CA_COMMON_NAME);
        }
        Ok(())
    }
}
