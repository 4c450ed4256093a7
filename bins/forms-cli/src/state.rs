// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Registry state file (JSON snapshot).

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use forms_registry::{Address, Registry, RegistrySnapshot, SystemClock};

/// Load the registry stored at `path`.
pub fn load(path: &Path) -> Result<Registry> {
    let bytes = fs::read(path).with_context(|| {
        format!(
            "read state {} (run `forms deploy` first)",
            path.display()
        )
    })?;
    let snapshot: RegistrySnapshot = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse state {}", path.display()))?;
    let registry = Registry::from_snapshot(snapshot, SystemClock)
        .with_context(|| format!("restore state {}", path.display()))?;
    tracing::debug!(path = %path.display(), forms = registry.form_count(), "state loaded");
    Ok(registry)
}

/// Write `registry` to `path`, replacing the previous file.
pub fn save(path: &Path, registry: &Registry) -> Result<()> {
    let json = serde_json::to_vec_pretty(&registry.snapshot())?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create state dir {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write state {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace state {}", path.display()))?;
    tracing::debug!(path = %path.display(), "state saved");
    Ok(())
}

/// Create a fresh registry state; refuses to clobber unless `force`.
pub fn deploy(path: &Path, owner: Address, force: bool) -> Result<Registry> {
    if path.exists() && !force {
        bail!(
            "state {} already exists (pass --force to replace it)",
            path.display()
        );
    }
    let registry = Registry::new(owner);
    save(path, &registry)?;
    tracing::info!(%owner, path = %path.display(), "registry deployed");
    Ok(registry)
}
