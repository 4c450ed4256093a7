// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! [`ConfigStore`] that keeps one `<key>.json` file per key in a directory.

use directories::ProjectDirs;
use forms_app_core::config::{ConfigError, ConfigStore};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory of JSON settings files.
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Store under the platform config dir (`~/.config/forms` on Linux).
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("dev", "flyingrobots", "forms")
            .ok_or_else(|| ConfigError::Other("no home directory for settings".into()))?;
        Self::at(dirs.config_dir())
    }

    /// Store under `base`, created if missing.
    pub fn at(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Settings directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Keys are plain file stems: no separators, no leading dot.
    fn file(&self, key: &str) -> Result<PathBuf, ConfigError> {
        if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\']) {
            return Err(ConfigError::Other(format!("invalid settings key {key:?}")));
        }
        Ok(self.base.join(format!("{key}.json")))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        fs::read(self.file(key)?).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::Io(err),
        })
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.file(key)?;
        let staged = path.with_extension("json.tmp");
        fs::write(&staged, data)?;
        fs::rename(&staged, &path)?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "settings saved");
        Ok(())
    }
}
