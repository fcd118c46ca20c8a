//! Configuration option keys and integration names.

pub const CA_COMMON_NAME: &str = "ca-common-name";
pub const CA_ORGANIZATION: &str = "ca-organization";
pub const CA_ORGANIZATIONAL_UNIT: &str = "ca-organizational-unit";
pub const CA_EMAIL_ADDRESS: &str = "ca-email-address";
pub const CA_COUNTRY_NAME: &str = "ca-country-name";
pub const CA_STATE_OR_PROVINCE_NAME: &str = "ca-state-or-province-name";
pub const CA_LOCALITY_NAME: &str = "ca-locality-name";

/// Name of the certificate-issuance integration CSRs arrive on.
pub const TLS_CERTIFICATES_INTEGRATION: &str = "certificates";

/// Action returning the CA certificate PEM.
pub const GET_CA_CERTIFICATE_ACTION: &str = "get-ca-certificate";
