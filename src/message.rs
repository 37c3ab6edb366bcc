//! Module defining the payload exchanged between the upload and the processing stages

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::domain::FileId;

/// Topic carrying the line-aligned chunks of uploaded files.
pub const ROWS_TOPIC: &str = "rows-to-process";

/// The bus payload. Field names are shared with independently deployed processors and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowsPayload {
    pub data: String,
    pub header: String,
    #[serde(rename = "fileId")]
    pub file_id: FileId,
}

impl RowsPayload {
    pub fn new(data: impl Into<String>, header: impl Into<String>, file_id: FileId) -> Self {
        Self {
            data: data.into(),
            header: header.into(),
            file_id,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a payload. Missing fields or fields of the wrong type are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
