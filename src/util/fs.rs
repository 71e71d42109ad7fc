//! Filesystem utilities.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Remove a directory and all its contents, if it exists.
///
/// Returns whether anything was removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
        return Ok(true);
    }
    Ok(false)
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Replace the contents of `path` atomically.
///
/// The data is written to a temporary file next to the real target and
/// renamed over it, so readers see either the old or the new content. A
/// symlinked path keeps its link and the file it points to is replaced. An
/// existing file keeps its permissions.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let target = resolve_symlinks(path)?;
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    if let Ok(meta) = fs::metadata(&target) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .with_context(|| format!("failed to copy permissions of {}", target.display()))?;
    }
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("failed to flush file: {}", path.display()))?;
    tmp.persist(&target)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace file: {}", target.display()))?;
    Ok(())
}

/// Follow a chain of symlinks to the path that actually holds the data.
/// The final target does not need to exist.
fn resolve_symlinks(path: &Path) -> Result<PathBuf> {
    let mut current = path.to_path_buf();
    // Bounded like the kernel's own loop limit.
    for _ in 0..40 {
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let link = fs::read_link(&current)
                    .with_context(|| format!("failed to read link: {}", current.display()))?;
                current = match current.parent() {
                    Some(parent) => parent.join(link),
                    None => link,
                };
            }
            _ => return Ok(current),
        }
    }
    anyhow::bail!("too many levels of symbolic links: {}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_dir_all_if_exists() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("build").join("Release");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("CMakeCache.txt"), "").unwrap();

        assert!(remove_dir_all_if_exists(&dir).unwrap());
        assert!(!dir.exists());
        assert!(!remove_dir_all_if_exists(&dir).unwrap());
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("profiles").join("default");

        write_atomic(&file, "[settings]\n").unwrap();
        write_atomic(&file, "[settings]\nos=Linux\n").unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "[settings]\nos=Linux\n");
        let leftovers = fs::read_dir(file.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("default");
        fs::write(&file, "[settings]\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();

        write_atomic(&file, "[settings]\nos=Linux\n").unwrap();

        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_through_symlink() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("shared").join("conanfile.py");
        fs::create_dir_all(real.parent().unwrap()).unwrap();
        fs::write(&real, "name = \"x\"\n").unwrap();
        let link = tmp.path().join("conanfile.py");
        std::os::unix::fs::symlink(Path::new("shared").join("conanfile.py"), &link).unwrap();

        write_atomic(&link, "name = 'y'\n").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "name = 'y'\n");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 2);
    }
}
