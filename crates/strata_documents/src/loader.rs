//! Document loading from files and directories.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::DocumentSet;
use crate::document::DocumentFile;
use crate::error::{DocumentError, DocumentResult};

/// Serialization format of a document file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
    Toml,
}

impl DocumentFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            "json" => Some(DocumentFormat::Json),
            "toml" => Some(DocumentFormat::Toml),
            _ => None,
        }
    }
}

/// Document loader.
pub struct DocumentLoader;

impl DocumentLoader {
    /// Load a single document file, or every document below a directory.
    pub fn load(path: impl AsRef<Path>) -> DocumentResult<DocumentSet> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocumentError::NotFound(path.to_path_buf()));
        }

        if path.is_dir() {
            Self::load_dir(path)
        } else {
            DocumentSet::from_file(Self::load_file(path)?)
        }
    }

    /// Load and parse one document file.
    pub fn load_file(path: impl AsRef<Path>) -> DocumentResult<DocumentFile> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)
            .ok_or_else(|| DocumentError::UnsupportedFormat(path.to_path_buf()))?;

        debug!("Loading {:?} document from {:?}", format, path);
        let content = fs::read_to_string(path)?;

        Self::parse(&content, format).map_err(|e| match e {
            DocumentError::Yaml(_) | DocumentError::Json(_) | DocumentError::Toml(_) => {
                DocumentError::InvalidFormat {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
            other => other,
        })
    }

    /// Parse document content in the given format.
    pub fn parse(content: &str, format: DocumentFormat) -> DocumentResult<DocumentFile> {
        if content.trim().is_empty() {
            return Ok(DocumentFile::default());
        }

        let file: DocumentFile = match format {
            DocumentFormat::Yaml => serde_yaml::from_str(content)?,
            DocumentFormat::Json => serde_json::from_str(content)?,
            DocumentFormat::Toml => toml::from_str(content)?,
        };
        Ok(file)
    }

    /// Load every supported document below `dir`, in path order.
    pub fn load_dir(dir: impl AsRef<Path>) -> DocumentResult<DocumentSet> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if DocumentFormat::from_path(path).is_some() {
                paths.push(path.to_path_buf());
            } else {
                warn!("Skipping unsupported file {:?}", path);
            }
        }

        let mut set = DocumentSet::new();
        for path in &paths {
            set.merge(Self::load_file(path)?)?;
        }

        info!("Loaded {} document(s) from {:?}", paths.len(), dir);
        Ok(set)
    }
}
