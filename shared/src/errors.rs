//! Shared error types for the IP intelligence system

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid IP address: {input}")]
    InvalidIp { input: String },

    #[error("IP address {ip} is in a non-routable range ({range})")]
    ReservedIp { ip: String, range: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Unknown source tag: {input}")]
    UnknownSourceTag { input: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
