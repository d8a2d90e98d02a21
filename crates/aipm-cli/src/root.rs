use std::path::{Path, PathBuf};

/// Markers that identify a project root, most specific first.
const ROOT_MARKERS: &[&str] = &[".aipm", ".claude", ".git"];

/// Resolve the project root directory.
///
/// Priority:
/// 1. `--root` flag / `AIPM_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from the current directory looking for `.aipm/`, then
///    `.claude/`, then `.git/`
/// 3. Fall back to the current directory
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root(&cwd)
}

fn find_root(start: &Path) -> PathBuf {
    for marker in ROOT_MARKERS {
        if let Some(dir) = start.ancestors().find(|dir| dir.join(marker).is_dir()) {
            return dir.to_path_buf();
        }
    }
    start.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_aipm_dir_above_cwd() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".aipm")).unwrap();
        let deep = dir.path().join("src/deep");
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(find_root(&deep), dir.path());
    }

    #[test]
    fn aipm_beats_git() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let project = dir.path().join("app");
        std::fs::create_dir_all(project.join(".aipm")).unwrap();
        assert_eq!(find_root(&project), project);
    }

    #[test]
    fn claude_dir_marks_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".claude/prds")).unwrap();
        let nested = dir.path().join("docs");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_root(&nested), dir.path());
    }
}
