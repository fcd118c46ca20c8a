use anyhow::Context;
use rcgen::{
    BasicConstraints, CertificateParams, CertificateSigningRequestParams, DistinguishedName,
    DnType, DnValue, Ia5String, IsCa, KeyPair, KeyUsagePurpose, PrintableString,
};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use pkg_constants::pki::{CA_VALIDITY_DAYS, CLOCK_SKEW_MINUTES, LEAF_VALIDITY_DAYS};
use pkg_types::subject::SubjectConfig;

/// OID of the PKCS#9 `emailAddress` attribute.
const EMAIL_ADDRESS_OID: &[u64] = &[1, 2, 840, 113549, 1, 9, 1];

/// Generate a fresh key pair and a self-signed root CA certificate for `subject`.
///
/// Every call yields a distinct key pair. The caller is expected to have
/// validated `subject` already.
/// Returns `(ca_cert_pem, private_key_pem)`.
pub fn generate_root_certificate(subject: &SubjectConfig) -> anyhow::Result<(String, String)> {
    info!("Generating root CA certificate for {}", subject.common_name);

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(subject)?;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    (params.not_before, params.not_after) = validity(CA_VALIDITY_DAYS);

    let key_pair = KeyPair::generate().context("could not generate CA key pair")?;
    let ca_cert = params
        .self_signed(&key_pair)
        .context("could not self-sign CA certificate")?;

    Ok((ca_cert.pem(), key_pair.serialize_pem()))
}

/// Sign a PEM-encoded PKCS#10 request with the given CA key and certificate.
/// Returns the leaf certificate PEM.
pub fn generate_certificate(
    ca_key_pem: &str,
    ca_cert_pem: &str,
    csr_pem: &str,
) -> anyhow::Result<String> {
    let ca = CertificateAuthority::from_pem(ca_key_pem, ca_cert_pem)?;
    ca.sign_request(csr_pem)
}

/// A root CA loaded from its PEM material, ready to sign requests.
pub struct CertificateAuthority {
    key_pair: KeyPair,
    cert: rcgen::Certificate,
}

impl CertificateAuthority {
    /// Parse the CA private key and certificate.
    pub fn from_pem(ca_key_pem: &str, ca_cert_pem: &str) -> anyhow::Result<Self> {
        let key_pair = KeyPair::from_pem(ca_key_pem).context("could not parse CA private key")?;
        let params = CertificateParams::from_ca_cert_pem(ca_cert_pem)
            .context("could not parse CA certificate")?;
        // rcgen signs against a `Certificate`; re-deriving it from the parsed
        // params keeps the original subject and key identifier.
        let cert = params
            .self_signed(&key_pair)
            .context("could not load CA certificate")?;

        Ok(Self { key_pair, cert })
    }

    /// Issue a leaf certificate for `csr_pem`: subject from the request, issuer from this CA.
    pub fn sign_request(&self, csr_pem: &str) -> anyhow::Result<String> {
        let mut csr = CertificateSigningRequestParams::from_pem(csr_pem)
            .context("could not decode certificate signing request")?;

        csr.params.is_ca = IsCa::ExplicitNoCa;
        csr.params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        csr.params.use_authority_key_identifier_extension = true;
        (csr.params.not_before, csr.params.not_after) = validity(LEAF_VALIDITY_DAYS);

        let cert = csr
            .signed_by(&self.cert, &self.key_pair)
            .context("could not sign certificate signing request")?;

        debug!("Signed leaf certificate");
        Ok(cert.pem())
    }
}

fn distinguished_name(subject: &SubjectConfig) -> anyhow::Result<DistinguishedName> {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, subject.common_name.as_str());

    if !subject.organization.is_empty() {
        dn.push(DnType::OrganizationName, subject.organization.as_str());
    }
    if !subject.organizational_unit.is_empty() {
        dn.push(
            DnType::OrganizationalUnitName,
            subject.organizational_unit.as_str(),
        );
    }
    if !subject.country_name.is_empty() {
        let country = PrintableString::try_from(subject.country_name.as_str())
            .context("country name is not a printable string")?;
        dn.push(DnType::CountryName, DnValue::PrintableString(country));
    }
    if !subject.state_or_province_name.is_empty() {
        dn.push(
            DnType::StateOrProvinceName,
            subject.state_or_province_name.as_str(),
        );
    }
    if !subject.locality_name.is_empty() {
        dn.push(DnType::LocalityName, subject.locality_name.as_str());
    }
    if !subject.email_address.is_empty() {
        let email = Ia5String::try_from(subject.email_address.as_str())
            .context("email address is not an IA5 string")?;
        dn.push(
            DnType::CustomDnType(EMAIL_ADDRESS_OID.to_vec()),
            DnValue::Ia5String(email),
        );
    }

    Ok(dn)
}

fn validity(days: i64) -> (OffsetDateTime, OffsetDateTime) {
    let now = OffsetDateTime::now_utc();
    (
        now - Duration::minutes(CLOCK_SKEW_MINUTES),
        now + Duration::days(days),
    )
}
