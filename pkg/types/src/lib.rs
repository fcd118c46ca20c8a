pub mod certificate;
pub mod config;
pub mod secret;
pub mod status;
pub mod subject;
