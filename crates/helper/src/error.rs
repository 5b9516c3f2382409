use std::path::PathBuf;
use thiserror::Error;

/// Errors generated by the helper.
#[derive(Debug, Error)]
pub enum Error {
    /// Error generated when a configuration file does not exist.
    #[error("path {0} is not a file")]
    NotFile(PathBuf),

    /// Errors generated by the wire protocol.
    #[error(transparent)]
    Wire(#[from] custodia_wire::Error),

    /// Errors generated by the IO module.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Errors generated parsing TOML.
    #[error(transparent)]
    TomlDeser(#[from] toml::de::Error),

    /// Errors generated serializing TOML.
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
