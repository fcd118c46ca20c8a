//! Centralized constants for certs-operator.
//!
//! Labels, keys and defaults shared by the operator crates live here so that
//! the on-store layout is defined in exactly one place.

pub mod config;
pub mod paths;
pub mod pki;
pub mod secrets;
pub mod state;
