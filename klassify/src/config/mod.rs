//! Configuration resolution for klassify

pub mod defaults;
mod settings;

pub use settings::{Configuration, Credentials, EnvFileStatus, Overrides};
