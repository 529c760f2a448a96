//! The error type every framevault crate converts into.
//!
//! HTTP handlers derive their status code from [`Error::http_status`], so the
//! variants are grouped by how a client should react, not by where they arose.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown item, media source, attachment index or file.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Malformed request input or configuration.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ffmpeg or ffprobe could not be run or exited with an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool { tool: String, message: String },

    /// A container could not be parsed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// The attachment cache could not be read or written.
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 400,
            Self::Probe(_) => 422,
            Self::Tool { .. } => 502,
            Self::Io(_) | Self::Storage { .. } | Self::Internal(_) => 500,
        }
    }
}
