//! Persistent client configuration

pub mod settings;
