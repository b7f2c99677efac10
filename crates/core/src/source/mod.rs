use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    process::Command,
};

use sha2::{Digest, Sha256};

use crate::{RecipeError, Result};

/// Reference to the library sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Release archive with the expected SHA-256 of its bytes.
    Archive { url: String, sha256: Option<String> },
    /// Pre-existing checkout used in place.
    Local(PathBuf),
}

/// Materializes a source tree for the build engine.
pub trait SourceFetcher {
    /// Returns the directory holding the sources. `dest` is where an
    /// extracted tree should land; local checkouts are returned as-is.
    fn fetch(&self, source: &SourceRef, dest: &Path) -> Result<PathBuf>;
}

/// Fetcher that never touches the network: archives are looked up by file
/// name in a download cache directory and unpacked with `tar`.
#[derive(Debug, Clone)]
pub struct FilesystemFetcher {
    archive_cache: PathBuf,
}

impl FilesystemFetcher {
    pub fn new(archive_cache: impl Into<PathBuf>) -> Self {
        Self {
            archive_cache: archive_cache.into(),
        }
    }

    /// Path the archive for `url` is expected at.
    pub fn archive_path(&self, url: &str) -> Result<PathBuf> {
        let file_name = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RecipeError::fetch(format!("cannot derive archive name from `{url}`")))?;
        Ok(self.archive_cache.join(file_name))
    }

    fn fetch_archive(&self, url: &str, sha256: Option<&str>, dest: &Path) -> Result<PathBuf> {
        let expected = sha256
            .ok_or_else(|| RecipeError::fetch(format!("no checksum pinned for `{url}`")))?;
        let archive = self.archive_path(url)?;
        if !archive.is_file() {
            return Err(RecipeError::fetch(format!(
                "archive `{}` not found in download cache",
                archive.display()
            )));
        }

        verify_checksum(&archive, expected)?;
        extract(&archive, dest)?;
        tracing::info!(archive = %archive.display(), dest = %dest.display(), "sources extracted");
        Ok(dest.to_path_buf())
    }
}

impl SourceFetcher for FilesystemFetcher {
    fn fetch(&self, source: &SourceRef, dest: &Path) -> Result<PathBuf> {
        match source {
            SourceRef::Local(path) => {
                if !path.is_dir() {
                    return Err(RecipeError::fetch(format!(
                        "local source directory `{}` does not exist",
                        path.display()
                    )));
                }
                tracing::info!(path = %path.display(), "using local sources");
                Ok(path.clone())
            }
            SourceRef::Archive { url, sha256 } => self.fetch_archive(url, sha256.as_deref(), dest),
        }
    }
}

/// Hex encoded SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Fails with [`RecipeError::Fetch`] unless `path` hashes to `expected`.
pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(RecipeError::fetch(format!(
            "checksum mismatch for `{}`: expected {expected}, got {actual}",
            path.display()
        )))
    }
}

// The release archives wrap everything in a single top-level directory.
fn extract(archive: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    let status = Command::new("tar")
        .arg("-xzf")
        .arg(archive)
        .arg("-C")
        .arg(dest)
        .arg("--strip-components=1")
        .status()
        .map_err(|err| RecipeError::fetch(format!("failed to launch tar: {err}")))?;

    if status.success() {
        Ok(())
    } else {
        Err(RecipeError::fetch(format!(
            "extracting `{}` failed ({status})",
            archive.display()
        )))
    }
}
