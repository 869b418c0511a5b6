//! File-system participant.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use txscope_transaction::{ParticipantError, ParticipantResult, ResourceParticipant};

const TEMP_SUFFIX: &str = ".txscope-tmp";

#[derive(Debug, Default)]
struct Staging {
    content: Option<Vec<u8>>,
    temp: Option<PathBuf>,
}

/// A file whose new content is staged in memory and published on commit.
///
/// Commit writes a sibling temporary file and renames it over the target, so
/// readers see either the old or the new content. Rollback discards the
/// staged content and any temporary file.
#[derive(Debug)]
pub struct StagedFile {
    name: String,
    target: PathBuf,
    staging: Mutex<Staging>,
}

impl StagedFile {
    pub fn new(target: impl Into<PathBuf>) -> Arc<Self> {
        let target = target.into();
        Arc::new(Self {
            name: format!("file:{}", target.display()),
            target,
            staging: Mutex::new(Staging::default()),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Replace the staged content.
    pub fn write(&self, content: impl Into<Vec<u8>>) {
        self.staging.lock().content = Some(content.into());
    }

    /// Append to the staged content, starting from the target's current
    /// content if nothing is staged yet.
    pub fn append(&self, content: &[u8]) -> io::Result<()> {
        let mut staging = self.staging.lock();
        if staging.content.is_none() {
            staging.content = Some(match fs::read(&self.target) {
                Ok(existing) => existing,
                Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
                Err(e) => return Err(e),
            });
        }
        if let Some(staged) = staging.content.as_mut() {
            staged.extend_from_slice(content);
        }
        Ok(())
    }

    /// Content that commit would publish.
    pub fn staged(&self) -> Option<Vec<u8>> {
        self.staging.lock().content.clone()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(TEMP_SUFFIX);
        self.target.with_file_name(name)
    }

    fn fail(&self, action: &str, path: &Path, error: io::Error) -> ParticipantError {
        ParticipantError::new(
            &self.name,
            format!("failed to {} {}: {}", action, path.display(), error),
        )
    }
}

impl ResourceParticipant for StagedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> ParticipantResult {
        match self.target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => Err(ParticipantError::new(
                &self.name,
                format!("directory {} does not exist", dir.display()),
            )),
            _ => Ok(()),
        }
    }

    fn commit(&self) -> ParticipantResult {
        let mut staging = self.staging.lock();
        let Some(content) = staging.content.take() else {
            return Ok(());
        };

        let temp = self.temp_path();
        staging.temp = Some(temp.clone());
        fs::write(&temp, &content).map_err(|e| self.fail("write", &temp, e))?;
        fs::rename(&temp, &self.target).map_err(|e| self.fail("rename", &temp, e))?;
        staging.temp = None;

        tracing::debug!(participant = %self.name, bytes = content.len(), "file published");
        Ok(())
    }

    fn rollback(&self) -> ParticipantResult {
        let mut staging = self.staging.lock();
        staging.content = None;
        if let Some(temp) = staging.temp.take() {
            match fs::remove_file(&temp) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(self.fail("remove", &temp, e)),
            }
        }
        Ok(())
    }
}
