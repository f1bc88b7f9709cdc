//! Helpers for locating external programs

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Resolve `program` the way a shell would
///
/// Names containing a slash are checked as paths; bare names are looked
/// up in `$PATH`. Only executable regular files count.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    if program.contains('/') {
        let path = PathBuf::from(program);
        return is_executable(&path).then_some(path);
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Whether a graphical session is reachable from this process
pub fn has_graphical_session() -> bool {
    ["WAYLAND_DISPLAY", "DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_sh_on_path() {
        assert!(find_in_path("sh").is_some());
    }

    #[test]
    fn missing_program_is_none() {
        assert!(find_in_path("definitely-not-a-real-program-xyz").is_none());
        assert!(find_in_path("").is_none());
    }

    #[test]
    fn absolute_paths_are_checked_directly() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("blocker");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        assert!(find_in_path(script.to_str().unwrap()).is_none());

        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();
        assert_eq!(find_in_path(script.to_str().unwrap()), Some(script));
    }
}
