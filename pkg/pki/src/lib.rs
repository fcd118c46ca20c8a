//! Certificate generation for the operator's root CA.
//!
//! [`ca`] creates the self-signed root and signs peer CSRs against it;
//! [`inspect`] decodes certificates and requests back into readable fields.

pub mod ca;
pub mod inspect;
