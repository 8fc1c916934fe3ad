//! Load `.stowage.toml` from a project root (CLI only). Lib callers pass values explicitly.

use serde::Deserialize;
use std::path::Path;

use crate::utils::config::{DEFAULT_LIST_LIMIT, LockConsts, PackagePaths};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SettingsToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    verbose: Option<bool>,
    lock_timeout_ms: Option<u64>,
    list_limit: Option<usize>,
    order_by: Option<String>,
}

/// Operator settings after applying the file. CLI flags override these.
#[derive(Clone, Debug)]
pub struct Settings {
    pub verbose: bool,
    pub lock_timeout_ms: u64,
    pub list_limit: usize,
    pub order_by: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbose: false,
            lock_timeout_ms: LockConsts::DEFAULT_TIMEOUT_MS,
            list_limit: DEFAULT_LIST_LIMIT,
            order_by: None,
        }
    }
}

/// Load the settings file from `dir` if present. Returns None if missing or unreadable.
pub(crate) fn load_settings_toml(dir: &Path) -> Option<SettingsToml> {
    let path = dir.join(PackagePaths::get().settings_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite a settings field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $settings:expr, $field:ident) => {
        if let Some(v) = $section.$field.clone() {
            $settings.$field = v;
        }
    };
}

/// Apply file config to defaults (only fields present in the file).
pub(crate) fn apply_file_to_settings(file: &SettingsToml, settings: &mut Settings) {
    let section = &file.settings;
    apply_file_opt!(section, settings, verbose);
    apply_file_opt!(section, settings, lock_timeout_ms);
    apply_file_opt!(section, settings, list_limit);
    if let Some(ref o) = section.order_by {
        settings.order_by = Some(o.clone());
    }
}

/// Defaults, then `.stowage.toml` in `dir`.
pub fn load_settings(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    if let Some(file) = load_settings_toml(dir) {
        apply_file_to_settings(&file, &mut settings);
    }
    settings
}
