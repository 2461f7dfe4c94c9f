//! Atomic on-disk persistence for [`IngestionProgress`] documents. Each
//! phase gets one JSON file, named after the phase, written with
//! write-temp-then-rename semantics so a crash mid-write never leaves a
//! torn file behind (spec §4.2/§6: progress lives on disk, not in SQL).

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::domain::IngestionProgress;
use crate::error::StoreError;

/// Holds one directory's worth of phase progress files.
pub struct ProgressStore {
    dir: PathBuf,
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ProgressStore { dir: dir.into() }
    }

    fn path_for(&self, phase_name: &str) -> PathBuf {
        self.dir.join(format!("{phase_name}.json"))
    }

    /// Loads the progress file for `phase_name`, if one exists.
    ///
    /// A file that fails to deserialize as the current task-level
    /// `IngestionProgress` shape (e.g. an old route-level document from a
    /// prior schema) is treated as absent: the phase restarts from
    /// scratch, and the condition is logged as a warning rather than
    /// silently discarded or treated as fatal — see the migration-path
    /// decision in DESIGN.md.
    pub async fn load(&self, phase_name: &str) -> Result<Option<IngestionProgress>, StoreError> {
        let path = self.path_for(phase_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<IngestionProgress>(&bytes) {
            Ok(progress) => Ok(Some(progress)),
            Err(e) => {
                warn!(
                    phase_name,
                    path = %path.display(),
                    error = %e,
                    "progress file did not match the current shape; treating phase as unstarted"
                );
                Ok(None)
            }
        }
    }

    /// Persists `progress` by writing to a sibling temp file and renaming
    /// it over the target, so readers never observe a partial write.
    pub async fn save(&self, progress: &IngestionProgress) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&progress.phase_name);
        let tmp_path = temp_path_for(&path);
        let bytes = serde_json::to_vec_pretty(progress)?;
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
