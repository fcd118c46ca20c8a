//! Filesystem path constants.

/// Default config file path for the operator.
pub const DEFAULT_CONFIG: &str = "/etc/certs-operator/config.yaml";

/// Default data directory for the SlateDB state store.
pub const DEFAULT_DATA_DIR: &str = "/tmp/certs-operator-data";

/// Default unit name used for leader election when none is configured.
pub const DEFAULT_UNIT_NAME: &str = "certs-operator/0";
