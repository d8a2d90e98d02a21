use crate::error::{AipmError, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting documents.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let wrap = |source| AipmError::FileOperation {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.write_all(data).map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}

/// Read a UTF-8 file, tagging failures with the path.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| AipmError::FileOperation {
        path: path.to_path_buf(),
        source,
    })
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| AipmError::FileOperation {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Rename within the same directory, refusing to clobber an existing target.
pub fn rename_no_clobber(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        return Err(AipmError::FileOperation {
            path: to.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "rename target already exists",
            ),
        });
    }
    std::fs::rename(from, to).map_err(|source| AipmError::FileOperation {
        path: from.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("epic.md");
        atomic_write(&path, b"---\nname: x\n---\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "---\nname: x\n---\n");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".claude/epics/demo/epic.md");
        atomic_write(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn read_text_missing_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.md");
        let err = read_text(&path).unwrap_err();
        assert!(err.to_string().contains("nope.md"));
    }

    #[test]
    fn write_if_missing_skips_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("existing.txt");
        std::fs::write(&path, b"original").unwrap();
        let written = write_if_missing(&path, b"new").unwrap();
        assert!(!written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn rename_no_clobber_refuses_existing_target() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();
        assert!(rename_no_clobber(&a, &b).is_err());
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "b");

        let c = dir.path().join("c.md");
        rename_no_clobber(&a, &c).unwrap();
        assert!(!a.exists());
        assert!(c.exists());
    }
}
