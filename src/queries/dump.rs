use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::QueryKind;

/// Writes each generated query to `<dir>/<kind>.sql` for offline inspection.
#[derive(Debug, Clone)]
pub struct SqlDump {
    dir: PathBuf,
}

impl SqlDump {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, kind: QueryKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Best effort: failures are logged and swallowed.
    pub fn record(&self, kind: QueryKind, sql: &str) {
        let path = self.path_for(kind);
        match self.write(&path, sql) {
            Ok(()) => tracing::debug!(path = %path.display(), "wrote generated SQL"),
            Err(err) => tracing::warn!("Could not write generated SQL to {}: {}", path.display(), err),
        }
    }

    fn write(&self, path: &Path, sql: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(path, sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn records_and_overwrites_query_files() {
        let root = TempDir::new().expect("temp dir");
        let dump = SqlDump::new(root.path().join(".compiled"));

        dump.record(QueryKind::GetRowCount, "SELECT 1");
        dump.record(QueryKind::GetRowCount, "SELECT 2");

        let written = fs::read_to_string(dump.path_for(QueryKind::GetRowCount)).expect("read");
        assert_eq!(written, "SELECT 2");
        assert!(dump.path_for(QueryKind::GetRowCount).ends_with("get-row-count.sql"));
    }

    #[test]
    fn unwritable_location_is_not_fatal() {
        let root = TempDir::new().expect("temp dir");
        let blocker = root.path().join("file");
        fs::write(&blocker, "").expect("write");

        // A regular file where the directory should be.
        let dump = SqlDump::new(&blocker);
        dump.record(QueryKind::CompareDetail, "SELECT 1");
        assert!(!dump.path_for(QueryKind::CompareDetail).exists());
    }
}
