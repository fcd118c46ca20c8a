use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Read-only key/value source for operator options.
///
/// Absence of a key is not an error: it reads as the empty string.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> String;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> String {
        HashMap::get(self, key).cloned().unwrap_or_default()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> String {
        BTreeMap::get(self, key).cloned().unwrap_or_default()
    }
}

/// Operator configuration file (YAML).
///
/// Example `config.yaml`:
/// ```yaml
/// data-dir: /var/lib/certs-operator
/// unit-name: certs-operator/0
/// integration: certificates
/// options:
///   ca-common-name: pizza.com
///   ca-organization: Pizza Inc
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorConfigFile {
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    #[serde(default, alias = "unit-name")]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub integration: Option<String>,
    /// Charm-style `ca-*` options, consumed through [`ConfigSource`].
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}
