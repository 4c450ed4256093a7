// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Saved defaults for the `forms` command-line tool.

use serde::{Deserialize, Serialize};

/// Config key under which [`RunnerPrefs`] are stored.
pub const RUNNER_PREFS_KEY: &str = "runner";

/// Fallback registry state file when neither flag nor prefs name one.
pub const DEFAULT_STATE_PATH: &str = "forms-state.json";

/// Persisted CLI defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerPrefs {
    /// Registry snapshot file used when `--state` is not given.
    pub state_path: String,
    /// Owner address used by `deploy` when `--owner` is not given.
    pub default_owner: Option<String>,
    /// `tracing` filter directive (e.g. `info`, `forms_tasks=debug`).
    pub log_filter: String,
}

impl Default for RunnerPrefs {
    fn default() -> Self {
        Self {
            state_path: DEFAULT_STATE_PATH.to_owned(),
            default_owner: None,
            log_filter: "info".to_owned(),
        }
    }
}
