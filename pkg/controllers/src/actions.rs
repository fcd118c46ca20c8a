use anyhow::{Context, anyhow};
use tracing::info;

use pkg_constants::secrets::{CA_CERTIFICATE_FIELD, CA_CERTIFICATE_SECRET_LABEL};
use pkg_state::secrets::SecretBackend;

/// `get-ca-certificate` action: the root CA certificate PEM.
///
/// Only needs the certificate, so a secret missing its private key still answers.
pub async fn get_ca_certificate(secrets: &dyn SecretBackend) -> anyhow::Result<String> {
    let content = secrets
        .get_by_label(CA_CERTIFICATE_SECRET_LABEL, true)
        .await
        .context("could not get CA certificate secret")?
        .ok_or_else(|| anyhow!("could not get CA certificate secret: not found"))?;

    let ca_certificate = content
        .get(CA_CERTIFICATE_FIELD)
        .cloned()
        .ok_or_else(|| anyhow!("could not find CA certificate in secret"))?;

    info!("Returning CA certificate");
    Ok(ca_certificate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemorySecrets;

    #[tokio::test]
    async fn test_returns_stored_certificate() {
        let secrets = MemorySecrets::default();
        secrets.insert(
            CA_CERTIFICATE_SECRET_LABEL,
            &[("ca-certificate", "CERT"), ("private-key", "KEY")],
        );

        assert_eq!(get_ca_certificate(&secrets).await.unwrap(), "CERT");
    }

    #[tokio::test]
    async fn test_missing_secret() {
        let secrets = MemorySecrets::default();
        let err = get_ca_certificate(&secrets).await.unwrap_err();
        assert!(err.to_string().contains("could not get CA certificate secret"));
    }

    #[tokio::test]
    async fn test_missing_certificate_field() {
        let secrets = MemorySecrets::default();
        secrets.insert(CA_CERTIFICATE_SECRET_LABEL, &[("private-key", "KEY")]);

        let err = get_ca_certificate(&secrets).await.unwrap_err();
        assert_eq!(err.to_string(), "could not find CA certificate in secret");
    }
}
