//! Module defining the metadata recorded once per uploaded file

use chrono::{DateTime, Utc};

use crate::domain::FileId;

/// One uploaded file. Read-only once the store assigned its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFileMetadata {
    id: Option<FileId>,
    file_name: String,
    created_at: Option<DateTime<Utc>>,
}

impl UploadFileMetadata {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            id: None,
            file_name: file_name.into(),
            created_at: None,
        }
    }

    /// Called by the store when the metadata row is inserted.
    pub fn assign(&mut self, id: FileId, created_at: DateTime<Utc>) {
        self.id = Some(id);
        self.created_at = Some(created_at);
    }

    pub fn id(&self) -> Option<&FileId> {
        self.id.as_ref()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}
