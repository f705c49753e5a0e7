//! File links.

use serde::{Deserialize, Serialize};

use crate::primitives::{FILE_LINK_DIR_SEPARATOR, FILE_LINK_SEPARATOR};

/// A reference to an external file attached to a spec or run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileLink {
    pub filename: String,
    pub url: String,
}

impl FileLink {
    #[must_use]
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
        }
    }

    /// Canonical identity: `filename + sep + url`, where `sep` is `"/"` when
    /// the filename ends in `"/"` and `","` otherwise.
    #[must_use]
    pub fn identity(&self) -> String {
        let sep = if self.filename.ends_with('/') {
            FILE_LINK_DIR_SEPARATOR
        } else {
            FILE_LINK_SEPARATOR
        };
        format!("{}{}{}", self.filename, sep, self.url)
    }
}
