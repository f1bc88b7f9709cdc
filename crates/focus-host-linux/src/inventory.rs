//! App inventory from XDG desktop entries

use async_trait::async_trait;
use focus_api::InstalledApp;
use focus_host_api::{AppInventory, Capability, HostError, HostResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lists applications from `.desktop` files
///
/// The identifier of an app is the basename of the program in its `Exec`
/// line, which is also what the process terminator matches against.
pub struct DesktopInventory {
    dirs: Vec<PathBuf>,
}

impl DesktopInventory {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// `$XDG_DATA_HOME/applications` followed by each `$XDG_DATA_DIRS` entry
    pub fn from_xdg() -> Self {
        let mut dirs = Vec::new();
        if let Some(data_home) = dirs::data_dir() {
            dirs.push(data_home.join("applications"));
        }

        let data_dirs = std::env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "/usr/local/share:/usr/share".into());
        dirs.extend(
            data_dirs
                .split(':')
                .filter(|d| !d.is_empty())
                .map(|d| Path::new(d).join("applications")),
        );

        Self::new(dirs)
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn scan(dirs: &[PathBuf]) -> Vec<InstalledApp> {
        let mut seen = HashSet::new();
        let mut apps = Vec::new();

        // Earlier directories take precedence
        for dir in dirs {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Skipping application directory");
                    continue;
                }
            };

            let mut files: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "desktop"))
                .collect();
            files.sort();

            for file in files {
                let Ok(content) = std::fs::read_to_string(&file) else {
                    warn!(file = %file.display(), "Unreadable desktop entry");
                    continue;
                };
                if let Some(app) = parse_desktop_entry(&content)
                    && seen.insert(app.id.clone())
                {
                    apps.push(app);
                }
            }
        }

        apps.sort_by(|a, b| a.display_name.to_lowercase().cmp(&b.display_name.to_lowercase()));
        apps
    }
}

#[async_trait]
impl AppInventory for DesktopInventory {
    async fn list(&self) -> HostResult<Vec<InstalledApp>> {
        let dirs = self.dirs.clone();
        let apps = tokio::task::spawn_blocking(move || Self::scan(&dirs))
            .await
            .map_err(|e| HostError::call_failed(Capability::Inventory, e.to_string()))?;
        debug!(count = apps.len(), "Desktop entries scanned");
        Ok(apps)
    }
}

/// Parse the `[Desktop Entry]` group of a desktop file
///
/// Returns `None` for hidden entries, non-applications, and entries without
/// a usable `Name` or `Exec`.
pub fn parse_desktop_entry(content: &str) -> Option<InstalledApp> {
    let mut in_entry = false;
    let mut name = None;
    let mut exec = None;
    let mut hidden = false;
    let mut is_application = true;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "Name" => name = Some(value.to_string()),
            "Exec" => exec = Some(value.to_string()),
            "Type" => is_application = value == "Application",
            "NoDisplay" | "Hidden" if value.eq_ignore_ascii_case("true") => hidden = true,
            _ => {}
        }
    }

    if hidden || !is_application {
        return None;
    }
    let id = exec_program(&exec?)?;
    Some(InstalledApp::new(name?, id))
}

/// Basename of the program an `Exec` line runs
///
/// Skips `env` and leading `VAR=value` assignments.
fn exec_program(exec: &str) -> Option<String> {
    let mut tokens = exec.split_whitespace().map(|t| t.trim_matches('"'));
    let mut program = tokens.next()?;
    if Path::new(program).file_name().is_some_and(|f| f == "env") {
        program = tokens.find(|t| !t.contains('=') && !t.starts_with('-'))?;
    }

    let basename = Path::new(program).file_name()?.to_str()?;
    (!basename.is_empty() && !basename.starts_with('%')).then(|| basename.to_string())
}
