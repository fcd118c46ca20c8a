use serde::{Deserialize, Serialize};

/// An outstanding certificate signing request discovered on a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequest {
    /// Relation the request arrived on.
    pub relation_id: String,
    /// PEM-encoded PKCS#10 request.
    pub csr: String,
    /// Subject common name parsed from the CSR. Informational only.
    #[serde(default)]
    pub common_name: String,
}

/// A certificate issued for a request, as published to the requiring peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCertificate {
    pub relation_id: String,
    /// Leaf certificate PEM.
    pub certificate: String,
    /// Issuing CA certificate PEM.
    pub ca: String,
    /// Certificate chain; always contains at least the CA certificate.
    pub chain: Vec<String>,
    /// The original request, echoed back so the peer can match it.
    pub csr: String,
    pub revoked: bool,
}

impl ProviderCertificate {
    /// Record for a freshly signed leaf issued directly by the root CA.
    pub fn issued(request: &CertificateRequest, certificate: String, ca: &str) -> Self {
        Self {
            relation_id: request.relation_id.clone(),
            certificate,
            ca: ca.to_string(),
            chain: vec![ca.to_string()],
            csr: request.csr.clone(),
            revoked: false,
        }
    }
}

/// Requirer side of a relation: which integration it belongs to and the CSRs it asks for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequirerData {
    pub integration: String,
    #[serde(default)]
    pub requests: Vec<String>,
}

/// Provider side of a relation: certificates published so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderData {
    #[serde(default)]
    pub certificates: Vec<ProviderCertificate>,
}

impl ProviderData {
    /// Whether a certificate answering `csr` has been published.
    pub fn answers(&self, csr: &str) -> bool {
        self.certificates.iter().any(|c| c.csr.trim() == csr.trim())
    }

    /// Insert `cert`, replacing any previous answer to the same CSR.
    pub fn upsert(&mut self, cert: ProviderCertificate) {
        self.certificates.retain(|c| c.csr.trim() != cert.csr.trim());
        self.certificates.push(cert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(csr: &str) -> CertificateRequest {
        CertificateRequest {
            relation_id: "certificates:1".to_string(),
            csr: csr.to_string(),
            common_name: "example.com".to_string(),
        }
    }

    #[test]
    fn issued_record_chains_to_ca() {
        let cert = ProviderCertificate::issued(&request("CSR"), "LEAF".to_string(), "CA");
        assert_eq!(cert.relation_id, "certificates:1");
        assert_eq!(cert.chain, vec!["CA".to_string()]);
        assert_eq!(cert.csr, "CSR");
        assert!(!cert.revoked);
    }

    #[test]
    fn provider_upsert_replaces_same_csr() {
        let mut data = ProviderData::default();
        data.upsert(ProviderCertificate::issued(&request("CSR-A"), "ONE".to_string(), "CA"));
        data.upsert(ProviderCertificate::issued(&request("CSR-A\n"), "TWO".to_string(), "CA"));
        data.upsert(ProviderCertificate::issued(&request("CSR-B"), "THREE".to_string(), "CA"));

        assert_eq!(data.certificates.len(), 2);
        assert!(data.answers("CSR-A"));
        assert!(data.answers("CSR-B"));
        assert!(!data.answers("CSR-C"));
        assert_eq!(data.certificates[0].certificate, "TWO");
    }
}
