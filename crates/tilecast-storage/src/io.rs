//! Atomic file operations

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

// Hidden name so loaders never pick up a half-written file
fn temp_path(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write data atomically using temp file + rename
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path(path);
    std::fs::write(&temp_path, data)?;
    std::fs::rename(temp_path, path)?;
    Ok(())
}

/// Stream lines into a temp file, sync it, then rename into place.
/// Returns the number of lines written.
pub fn write_lines_atomic(
    path: &Path,
    lines: &mut dyn Iterator<Item = String>,
) -> std::io::Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path(path);
    let file = File::create(&temp_path)?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;
    for line in lines {
        writeln!(writer, "{}", line)?;
        count += 1;
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    std::fs::rename(temp_path, path)?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_write() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested/stats.json");

        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
        assert!(!temp.path().join("nested/.stats.json.tmp").exists());
    }

    #[test]
    fn test_write_lines_atomic() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("run/part-00000");

        let mut lines = vec!["a".to_string(), "b".to_string()].into_iter();
        let written = write_lines_atomic(&path, &mut lines).unwrap();

        assert_eq!(written, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }
}
