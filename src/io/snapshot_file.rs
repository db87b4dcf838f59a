//! JSON snapshot files
//!
//! A snapshot file holds `{ "books": [...], "members": [...],
//! "transactions": [...] }` in the same shapes the REST backend uses.

use crate::types::{CirculationError, Snapshot};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Read a snapshot file
///
/// # Errors
///
/// Returns `FileNotFound` if the file does not exist, `IoError` if it
/// cannot be read, and `ParseError` if it is not a valid snapshot.
pub fn load(path: &Path) -> Result<Snapshot, CirculationError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CirculationError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => e.into(),
    })?;

    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Read a snapshot file, starting from an empty snapshot if it is missing
pub fn load_or_default(path: &Path) -> Result<Snapshot, CirculationError> {
    match load(path) {
        Err(CirculationError::FileNotFound { .. }) => {
            tracing::info!("{} does not exist yet, starting empty", path.display());
            Ok(Snapshot::default())
        }
        other => other,
    }
}

/// Write a snapshot file, replacing any previous content
///
/// The snapshot is written to a temporary file next to `path` and renamed
/// over it, so readers see either the old file or the new one.
///
/// # Errors
///
/// Returns `IoError` if the file cannot be written. The previous content is
/// left untouched in that case.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), CirculationError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, snapshot).map_err(|e| {
            CirculationError::IoError {
                message: e.to_string(),
            }
        })?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    file.as_file().sync_all()?;

    file.persist(path).map_err(|e| e.error)?;
    tracing::debug!("Saved snapshot to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::demo::demo_snapshot;
    use chrono::{TimeZone, Utc};
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("library.json");
        let now = Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).unwrap();
        let snapshot = demo_snapshot(now);

        save(&path, &snapshot).unwrap();
        assert_eq!(load(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_save_replaces_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("library.json");
        let now = Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).unwrap();
        std::fs::write(&path, "stale").unwrap();

        save(&path, &Snapshot::default()).unwrap();
        save(&path, &demo_snapshot(now)).unwrap();

        assert_eq!(load(&path).unwrap(), demo_snapshot(now));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_failed_save_keeps_target_and_cleans_up() {
        let dir = tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file
        let path = dir.path().join("library.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep.txt"), "kept").unwrap();

        let result = save(&path, &Snapshot::default());

        assert!(matches!(result, Err(CirculationError::IoError { .. })));
        assert_eq!(std::fs::read_to_string(path.join("keep.txt")).unwrap(), "kept");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent").join("library.json");

        assert!(matches!(
            save(&path, &Snapshot::default()),
            Err(CirculationError::IoError { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");

        assert!(matches!(
            load(&path),
            Err(CirculationError::FileNotFound { .. })
        ));
        assert_eq!(load_or_default(&path).unwrap(), Snapshot::default());
    }

    #[test]
    fn test_backend_shapes_are_accepted() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "books": [{{"id": 1, "title": "Dune", "author": "Frank Herbert",
                           "totalCopies": 2, "availableCopies": 1}}],
                "members": [{{"memberId": 1, "name": "Ada", "email": "ada@example.org",
                             "membershipStatus": "ACTIVE", "registrationDate": "2024-01-15"}}],
                "transactions": [{{"transactionId": 1, "bookId": 1, "memberId": 1,
                                  "borrowDate": "2024-11-01", "dueDate": "2024-11-15",
                                  "status": "BORROWED"}}]
            }}"#
        )
        .unwrap();

        let snapshot = load(file.path()).unwrap();
        assert_eq!(snapshot.books[0].available_copies, 1);
        assert!(snapshot.members[0].is_active());
        assert!(snapshot.transactions[0].is_open());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"books\": [").unwrap();

        assert!(matches!(
            load(file.path()),
            Err(CirculationError::ParseError { .. })
        ));
    }
}
