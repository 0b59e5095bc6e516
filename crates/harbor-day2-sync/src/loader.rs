//! Reading configuration documents from disk.

use std::path::{Path, PathBuf};

use harbor_day2_api::RegistryClient;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::kind::ResourceKind;
use crate::template::TemplateRenderer;

/// Loads documents from a configuration folder, rendering placeholders
/// before they are decoded.
#[derive(Clone, Copy)]
pub struct DocumentLoader<'a> {
    folder: &'a Path,
    renderer: TemplateRenderer<'a>,
}

impl<'a> DocumentLoader<'a> {
    pub fn new(folder: &'a Path, client: &'a dyn RegistryClient) -> Self {
        Self {
            folder,
            renderer: TemplateRenderer::new(client),
        }
    }

    pub fn path_of(&self, kind: ResourceKind) -> PathBuf {
        self.folder.join(kind.document())
    }

    /// Loads the document for `kind`, or `None` if its file does not exist.
    pub async fn load<T: DeserializeOwned>(&self, kind: ResourceKind) -> SyncResult<Option<T>> {
        let path = self.path_of(kind);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => {
                info!(kind = %kind, path = %path.display(), "No document found, skipping");
                return Ok(None);
            }
            Err(source) => return Err(SyncError::Read { path, source }),
        }
        self.load_file(&path).await.map(Some)
    }

    /// Reads, renders and decodes one document.
    pub async fn load_file<T: DeserializeOwned>(&self, path: &Path) -> SyncResult<T> {
        debug!(path = %path.display(), "Loading document");
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SyncError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let rendered = self
            .renderer
            .render(&raw)
            .await
            .map_err(|source| SyncError::Render {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&rendered).map_err(|source| SyncError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}
