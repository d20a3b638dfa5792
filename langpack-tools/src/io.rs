//! JSON file reading and atomic writes

use crate::error::{Result, ToolError};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<Value> {
    if !path.is_file() {
        return Err(ToolError::InputFileMissing(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| ToolError::invalid_json(path, e))
}

/// Read a JSON file whose root must be an object.
pub fn read_json_object(path: &Path) -> Result<Map<String, Value>> {
    match read_json(path)? {
        Value::Object(map) => Ok(map),
        _ => Err(ToolError::NotAnObject(path.display().to_string())),
    }
}

/// Pretty-print with two-space indentation, non-ASCII kept verbatim.
pub fn to_pretty_json(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| {
        ToolError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

/// Content sitting in a temporary file next to its destination.
pub struct StagedFile {
    file: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    /// Rename the temporary file over the destination.
    pub fn persist(self) -> Result<PathBuf> {
        self.file.persist(&self.path).map_err(|e| ToolError::Io(e.error))?;
        Ok(self.path)
    }
}

/// Write `content` into a temporary file in the destination directory.
/// Dropping the result removes it again.
pub fn stage(path: &Path, content: &str) -> Result<StagedFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    Ok(StagedFile {
        file,
        path: path.to_path_buf(),
    })
}

/// Write `content` to `path` through a temporary file in the same directory,
/// so readers never observe a partially written file.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    stage(path, content)?.persist()?;
    Ok(())
}

/// Stage every file before persisting any of them.
///
/// A failure while staging leaves every destination untouched. Only the
/// final renames can fail part way.
pub fn write_all_atomic(files: &[(PathBuf, String)]) -> Result<Vec<PathBuf>> {
    let staged = files
        .iter()
        .map(|(path, content)| stage(path, content))
        .collect::<Result<Vec<_>>>()?;
    staged.into_iter().map(StagedFile::persist).collect()
}

/// Pretty-print `value` and write it atomically.
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    write_atomic(path, &to_pretty_json(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_json(&dir.path().join("absent.json")),
            Err(ToolError::InputFileMissing(_))
        ));
    }

    #[test]
    fn test_read_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"a\": ").unwrap();
        assert!(matches!(read_json(&path), Err(ToolError::InputJsonInvalid { .. })));
    }

    #[test]
    fn test_read_object_rejects_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(read_json_object(&path), Err(ToolError::NotAnObject(_))));
    }

    #[test]
    fn test_write_json_keeps_unicode_and_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        write_json(&path, &json!({"z": "你好", "a": 1})).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n  \"z\": \"你好\",\n  \"a\": 1\n}");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_failed_staging_writes_nothing() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let files = vec![
            (dir.path().join("first.json"), "{}".to_string()),
            (blocker.join("second.json"), "{}".to_string()),
        ];
        assert!(write_all_atomic(&files).is_err());
        assert!(!dir.path().join("first.json").exists());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("blocker")]);
    }

    #[test]
    fn test_write_all_atomic_returns_paths_in_order() {
        let dir = tempdir().unwrap();
        let files = vec![
            (dir.path().join("b.json"), "1".to_string()),
            (dir.path().join("a.json"), "2".to_string()),
        ];
        let written = write_all_atomic(&files).unwrap();
        assert_eq!(written, vec![dir.path().join("b.json"), dir.path().join("a.json")]);
        assert_eq!(std::fs::read_to_string(dir.path().join("a.json")).unwrap(), "2");
    }
}
