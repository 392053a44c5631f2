use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use uuid::Uuid;

/// The on-disk copy of one export. The file is removed when this value is
/// dropped, whichever way the request ends.
#[derive(Debug)]
pub(crate) struct TempArtifact {
    path: PathBuf,
    download_name: String,
}

impl TempArtifact {
    pub fn new(dir: &Path, db_name: &str) -> Self {
        let file_name = format!(
            "result_{}_{}.xlsx",
            sanitize_file_stem(db_name),
            Uuid::new_v4().simple()
        );
        Self {
            path: dir.join(file_name),
            download_name: download_name(db_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name the client sees in `Content-Disposition`.
    pub fn download_name(&self) -> &str {
        &self.download_name
    }

    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

pub(crate) fn download_name(db_name: &str) -> String {
    format!("result_{}.xlsx", db_name)
}

fn sanitize_file_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
