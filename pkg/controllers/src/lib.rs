//! Issuance control flow: CA material, outstanding requests, and the hook
//! state machine that sequences them.

pub mod actions;
pub mod ca_store;
pub mod issuance;

#[cfg(test)]
mod fakes;
