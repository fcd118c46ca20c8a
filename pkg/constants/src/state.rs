//! State store / leader election constants.

/// etcd-style key for the CA leader lease.
pub const LEADER_LEASE_KEY: &str = "/registry/leases/ca-leader";

/// Lease identifier written into every lease record.
pub const LEADER_LEASE_ID: &str = "ca-leader";

/// How long a leader lease is valid, in seconds.
pub const LEADER_LEASE_TTL_SECS: u64 = 15;

/// Prefix under which labelled secrets are stored.
/// Full key = `SECRETS_PREFIX + label`.
pub const SECRETS_PREFIX: &str = "/registry/secrets/";

/// Prefix for relation data bags.
/// Requirer bag = `RELATIONS_PREFIX + relation_id + "/requirer"`,
/// provider bag = `RELATIONS_PREFIX + relation_id + "/provider"`.
pub const RELATIONS_PREFIX: &str = "/registry/relations/";

/// Suffix of the data bag written by the requesting peer.
pub const REQUIRER_BAG: &str = "requirer";

/// Suffix of the data bag written by this operator.
pub const PROVIDER_BAG: &str = "provider";

/// Prefix for unit status records.
/// Full key = `UNITS_PREFIX + unit_name + "/status"`.
pub const UNITS_PREFIX: &str = "/registry/units/";
