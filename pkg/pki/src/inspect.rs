use anyhow::{Context, anyhow};
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::prelude::*;

/// Decoded fields of an X.509 certificate.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    /// RFC 4514 subject string.
    pub subject: String,
    /// RFC 4514 issuer string.
    pub issuer: String,
    /// First subject common name, empty if none.
    pub common_name: String,
    pub is_ca: bool,
    /// Value of the basic constraints `cA` flag, `None` if the extension is absent.
    pub basic_constraints_ca: Option<bool>,
    pub can_sign_certificates: bool,
    pub digital_signature: bool,
    pub key_encipherment: bool,
    /// Validity window as Unix timestamps.
    pub not_before: i64,
    pub not_after: i64,
}

/// Decode the first certificate in `cert_pem`.
pub fn inspect_certificate(cert_pem: &str) -> anyhow::Result<CertificateInfo> {
    let mut reader = cert_pem.as_bytes();
    let der = rustls_pemfile::certs(&mut reader)
        .next()
        .ok_or_else(|| anyhow!("no certificate found in PEM"))?
        .context("could not read certificate PEM")?;

    let (_, cert) = parse_x509_certificate(der.as_ref())
        .map_err(|e| anyhow!("could not parse certificate: {}", e))?;

    let basic_constraints_ca = cert
        .basic_constraints()
        .ok()
        .flatten()
        .map(|bc| bc.value.ca);
    let key_usage = cert.key_usage().ok().flatten().map(|ku| ku.value);

    Ok(CertificateInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        common_name: common_name(cert.subject()).unwrap_or_default(),
        is_ca: basic_constraints_ca.unwrap_or(false),
        basic_constraints_ca,
        can_sign_certificates: key_usage.is_some_and(|ku| ku.key_cert_sign()),
        digital_signature: key_usage.is_some_and(|ku| ku.digital_signature()),
        key_encipherment: key_usage.is_some_and(|ku| ku.key_encipherment()),
        not_before: cert.validity().not_before.timestamp(),
        not_after: cert.validity().not_after.timestamp(),
    })
}

/// Subject common name of a PEM-encoded PKCS#10 request.
pub fn csr_common_name(csr_pem: &str) -> anyhow::Result<String> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(csr_pem.as_bytes())
        .map_err(|e| anyhow!("could not decode certificate signing request PEM: {}", e))?;
    let (_, csr) = X509CertificationRequest::from_der(&pem.contents)
        .map_err(|e| anyhow!("could not parse certificate signing request: {}", e))?;

    common_name(&csr.certification_request_info.subject)
        .ok_or_else(|| anyhow!("certificate signing request has no common name"))
}

fn common_name(name: &X509Name<'_>) -> Option<String> {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
}
