//! Temporary install trees for engine tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;
use updraft_config::EngineConfig;
use updraft_config::defaults::STATE_DIR;
use updraft_core::Version;
use walkdir::WalkDir;

use crate::payload::md5_hex;

/// An install root and a staging root inside one temporary directory.
///
/// The staging root sits beside the install root so snapshots of the install
/// tree never include staged payloads.
#[derive(Debug)]
pub struct InstallFixture {
    _temp: TempDir,
    install_root: PathBuf,
    staging_root: PathBuf,
}

impl InstallFixture {
    /// Create empty install and staging roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directories cannot be created.
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let install_root = temp.path().join("app");
        let staging_root = temp.path().join("staging");
        fs::create_dir_all(&install_root)?;
        fs::create_dir_all(&staging_root)?;
        Ok(Self {
            _temp: temp,
            install_root,
            staging_root,
        })
    }

    /// Install root.
    #[must_use]
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Staging root.
    #[must_use]
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Engine configuration pointing at this fixture.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        EngineConfig::for_install_root(&self.install_root).with_staging_root(&self.staging_root)
    }

    /// Location of a path relative to the install root.
    #[must_use]
    pub fn path(&self, relative: &str) -> PathBuf {
        self.install_root.join(relative)
    }

    /// Write `bytes` to `relative` under the install root, creating parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn install_file(&self, relative: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Read `relative` under the install root, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error for read failures other than a missing file.
    pub fn read_file(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(relative)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Whether `relative` exists under the install root.
    #[must_use]
    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// Stage `bytes` as `name` for `version` and return its MD5 digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    pub fn stage_payload(&self, version: Version, name: &str, bytes: &[u8]) -> Result<String> {
        let path = self.staging_root.join(version.path_safe()).join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(md5_hex(bytes))
    }

    /// Write the patch script at the configured location.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be written.
    pub fn write_script(&self, text: &str) -> Result<PathBuf> {
        let path = self.config().script_path;
        fs::write(&path, text)?;
        Ok(path)
    }

    /// Write the installed-version marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn write_marker(&self, version: Version) -> Result<()> {
        let path = self.config().marker_path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, format!("{version}\n"))?;
        Ok(())
    }

    /// Raw marker contents, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error for read failures other than a missing file.
    pub fn read_marker(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.config().marker_path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Every file and directory under the install root, engine state excluded.
    ///
    /// Directories map to `None`, files to their bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be walked or a file cannot be read.
    pub fn snapshot(&self) -> Result<BTreeMap<PathBuf, Option<Vec<u8>>>> {
        let mut tree = BTreeMap::new();
        let walker = WalkDir::new(&self.install_root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != STATE_DIR);
        for entry in walker {
            let entry = entry?;
            let relative = entry.path().strip_prefix(&self.install_root)?.to_path_buf();
            let contents = if entry.file_type().is_file() {
                Some(fs::read(entry.path())?)
            } else {
                None
            };
            tree.insert(relative, contents);
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_round_trips_files_and_marker() -> Result<()> {
        let fixture = InstallFixture::new()?;
        fixture.install_file("nested/a.txt", b"alpha")?;
        assert_eq!(fixture.read_file("nested/a.txt")?, Some(b"alpha".to_vec()));
        assert_eq!(fixture.read_file("missing")?, None);

        assert_eq!(fixture.read_marker()?, None);
        fixture.write_marker(Version::from_parts(1, 0, 0))?;
        assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.0.0\n"));

        let snapshot = fixture.snapshot()?;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains_key(Path::new("nested")));
        Ok(())
    }

    #[test]
    fn staged_payload_lands_in_version_dir() -> Result<()> {
        let fixture = InstallFixture::new()?;
        let digest = fixture.stage_payload(Version::from_parts(1, 1, 0), "foo.txt", b"abc")?;
        assert_eq!(digest, "900150983cd24fb0d6963f7d28e17f72");
        assert!(fixture.staging_root().join("1_1_0/foo.txt").is_file());
        Ok(())
    }
}
