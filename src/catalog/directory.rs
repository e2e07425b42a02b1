//! MCP server listings loaded from a JSON data file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::filter::{filter_mcp, mcp_categories};
use super::types::{McpListing, McpQuery};

/// Errors raised while loading the listing file.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a JSON array of listings.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Immutable, in-memory MCP directory.
#[derive(Debug, Clone, Default)]
pub struct McpDirectory {
    listings: Vec<McpListing>,
}

impl McpDirectory {
    /// Wrap an explicit set of listings.
    pub fn from_listings(listings: Vec<McpListing>) -> Self {
        Self { listings }
    }

    /// Load listings from `path`. A missing file yields an empty directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "MCP directory file not found; starting empty");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(DirectoryError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let listings: Vec<McpListing> =
            serde_json::from_str(&raw).map_err(|source| DirectoryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(path = %path.display(), listings = listings.len(), "Loaded MCP directory");
        Ok(Self { listings })
    }

    /// Every listing in file order.
    pub fn all(&self) -> &[McpListing] {
        &self.listings
    }

    /// Listings matching `query`, sorted as requested.
    pub fn search(&self, query: &McpQuery) -> Vec<McpListing> {
        filter_mcp(&self.listings, query)
    }

    /// Listing with `id`, if present.
    pub fn get(&self, id: &str) -> Option<&McpListing> {
        self.listings.iter().find(|listing| listing.id == id)
    }

    /// `All` followed by the distinct categories.
    pub fn categories(&self) -> Vec<String> {
        mcp_categories(&self.listings)
    }

    /// Number of listings.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Whether the directory holds no listings.
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
