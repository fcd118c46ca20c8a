//! Secret labels and content keys.

/// Label of the secret holding the root CA material.
pub const CA_CERTIFICATE_SECRET_LABEL: &str = "active-ca-certificates";

/// Secret content key for the PEM-encoded CA private key.
pub const PRIVATE_KEY_FIELD: &str = "private-key";

/// Secret content key for the PEM-encoded CA certificate.
pub const CA_CERTIFICATE_FIELD: &str = "ca-certificate";
