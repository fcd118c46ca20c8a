//! Certificate generation constants.

/// Validity of the self-signed root CA certificate, in days.
pub const CA_VALIDITY_DAYS: i64 = 365 * 10;

/// Validity of leaf certificates issued from CSRs, in days.
pub const LEAF_VALIDITY_DAYS: i64 = 365;

/// Backdating applied to `not_before` to absorb clock skew between peers, in minutes.
pub const CLOCK_SKEW_MINUTES: i64 = 5;
