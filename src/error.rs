use std::{error::Error, fmt, io, path::PathBuf};

use thiserror::Error;

/// Errors produced while reading or writing scene documents.
///
/// The snapshot and restore operations themselves never fail; they log and
/// return early when their preconditions are missing.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("malformed scene document at path {}", .path.display())]
    MalformedDocument {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[error("could not encode scene document")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },

    #[error("unknown node element '{tag}'")]
    UnknownNodeTag { tag: String },

    #[error("invalid value '{value}' for attribute '{name}' on element '{tag}'")]
    InvalidAttribute {
        tag: String,
        name: String,
        value: String,
    },

    #[error(transparent)]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SceneError {
    pub(crate) fn malformed_document(source: serde_json::Error, path: impl Into<PathBuf>) -> Self {
        Self::MalformedDocument {
            source,
            path: path.into(),
        }
    }

    pub(crate) fn unknown_node_tag(tag: impl Into<String>) -> Self {
        Self::UnknownNodeTag { tag: tag.into() }
    }

    pub(crate) fn invalid_attribute(
        tag: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            tag: tag.into(),
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Wrapper type to print errors with source-chasing.
pub struct ErrorDisplay<E>(pub E);

impl<E: Error> fmt::Display for ErrorDisplay<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        writeln!(formatter, "{}", self.0)?;

        let mut current_err: &dyn Error = &self.0;
        while let Some(source) = current_err.source() {
            writeln!(formatter, "  caused by {}", source)?;
            current_err = source;
        }

        Ok(())
    }
}
