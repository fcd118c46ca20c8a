//! SlateDB-backed state for the operator.
//!
//! One [`client::StateStore`] holds everything that outlives an invocation:
//! labelled secrets, relation data bags, unit status and the leader lease.
//! Each collaborator the issuance core talks to is a trait here, with an
//! implementation over the store.

pub mod client;
pub mod leader;
pub mod relation;
pub mod secrets;
pub mod status;
