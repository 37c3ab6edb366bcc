//! Staging of uploads into temporary files on the local disk

use std::io::{Read, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::Error;
use crate::error::staging_error;
use crate::ports::{StagedFile, Staging};

/// Copies every upload into its own temporary file, inside `dir` or the system temp directory.
#[derive(Debug, Default, Clone)]
pub struct LocalStaging {
    dir: Option<PathBuf>,
}

impl LocalStaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }
}

impl Staging for LocalStaging {
    fn save(&self, stream: &mut dyn Read) -> Result<Box<dyn StagedFile>, Error> {
        let created = match &self.dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        };
        let mut file =
            created.map_err(|e| staging_error(format!("cannot create staging file: {e}")))?;

        let bytes = std::io::copy(stream, &mut file)
            .and_then(|bytes| file.flush().map(|()| bytes))
            .map_err(|e| staging_error(format!("cannot stage upload: {e}")))?;

        debug!(path = %file.path().display(), bytes, "upload staged");
        Ok(Box::new(LocalStagedFile { file }))
    }
}

struct LocalStagedFile {
    file: NamedTempFile,
}

impl StagedFile for LocalStagedFile {
    fn open(&self) -> Result<Box<dyn Read + Send>, Error> {
        let reader = self
            .file
            .reopen()
            .map_err(|e| staging_error(format!("cannot reopen staged upload: {e}")))?;
        Ok(Box::new(reader))
    }

    fn delete(self: Box<Self>) -> Result<(), Error> {
        self.file
            .close()
            .map_err(|e| staging_error(format!("cannot delete staged upload: {e}")))
    }
}
