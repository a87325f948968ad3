//! Text tables on disk.
//!
//! RULE: Only table.rs talks to the filesystem.
//! Stages read every field as text; numeric parsing happens where a
//! stage actually needs numbers, so identifiers never lose precision.

use crate::error::{PipelineError, PipelineResult};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a CSV table with a header row. Header names are trimmed.
    pub fn read(path: impl AsRef<Path>) -> PipelineResult<Self> {
        Self::read_with(path, true)
    }

    /// Read a CSV table. When `has_headers` is false the first column is
    /// named `txId` and the rest are numbered from 1.
    pub fn read_with(path: impl AsRef<Path>, has_headers: bool) -> PipelineResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::File::open(&path).map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;
        let mut reader = ReaderBuilder::new()
            .has_headers(has_headers)
            .trim(Trim::Headers)
            .from_reader(file);
        let csv_err = |source| PipelineError::Csv { path: path.clone(), source };

        let mut headers: Vec<String> = if has_headers {
            reader.headers().map_err(csv_err)?.iter().map(str::to_string).collect()
        } else {
            Vec::new()
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        if !has_headers {
            let width = rows.first().map(Vec::len).unwrap_or(0);
            headers = (0..width)
                .map(|i| if i == 0 { "txId".to_string() } else { i.to_string() })
                .collect();
        }

        log::debug!("read {} rows x {} columns from {}", rows.len(), headers.len(), path.display());
        Ok(Self { path, headers, rows })
    }

    /// Position of a named column, or MissingColumn naming this table.
    pub fn column_index(&self, column: &str) -> PipelineResult<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PipelineError::MissingColumn {
                path: self.path.clone(),
                column: column.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write a set of tables so that either all of them reach their paths or
    /// none do. Each is staged next to its target, then renamed into place.
    pub fn write_all(tables: &[&Table]) -> PipelineResult<()> {
        let mut staged: Vec<PathBuf> = Vec::with_capacity(tables.len());
        for table in tables {
            let tmp = staging_path(&table.path);
            if let Err(e) = table.write_to(&tmp) {
                let _ = std::fs::remove_file(&tmp);
                for path in &staged {
                    let _ = std::fs::remove_file(path);
                }
                return Err(e);
            }
            staged.push(tmp);
        }
        for (table, tmp) in tables.iter().zip(&staged) {
            std::fs::rename(tmp, &table.path).map_err(|source| PipelineError::Io {
                path: table.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Write header + rows as CSV to `path`, creating parent directories as needed.
    fn write_to(&self, path: &Path) -> PipelineResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let csv_err = |source| PipelineError::Csv { path: path.to_path_buf(), source };
        let mut writer = WriterBuilder::new().from_path(path).map_err(csv_err)?;
        writer.write_record(&self.headers).map_err(csv_err)?;
        for row in &self.rows {
            writer.write_record(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

/// `dir/name.csv` -> `dir/.name.csv.tmp`
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, " txId , class\n1, 2\n").unwrap();
        let table = Table::read(&path).unwrap();
        assert_eq!(table.headers, vec!["txId", "class"]);
        assert_eq!(table.rows, vec![vec!["1".to_string(), " 2".to_string()]]);
        assert_eq!(table.column_index("class").unwrap(), 1);
    }

    #[test]
    fn headerless_tables_get_positional_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.csv");
        std::fs::write(&path, "230425980,1,0.5\n5530458,1,0.7\n").unwrap();
        let table = Table::read_with(&path, false).unwrap();
        assert_eq!(table.headers, vec!["txId", "1", "2"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn missing_column_names_the_table() {
        let table = Table {
            path: PathBuf::from("classes.csv"),
            headers: vec!["txId".into()],
            rows: vec![],
        };
        let err = table.column_index("class").unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "class"));
        assert!(err.to_string().contains("classes.csv"));
    }

    #[test]
    fn failed_write_all_leaves_no_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "").unwrap();
        let table = |path: PathBuf| Table {
            path,
            headers: vec!["txId".into()],
            rows: vec![vec!["1".into()]],
        };
        let first = table(dir.path().join("a.csv"));
        let second = table(dir.path().join("b.csv"));
        let third = table(blocker.join("c.csv"));

        assert!(Table::write_all(&[&first, &second, &third]).is_err());
        let left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from("not_a_dir")]);
    }

    #[test]
    fn write_all_moves_every_table_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table {
            path: dir.path().join("out/x.csv"),
            headers: vec!["txId".into(), "label".into()],
            rows: vec![vec!["7".into(), "1".into()]],
        };
        Table::write_all(&[&table]).unwrap();
        assert_eq!(std::fs::read_to_string(&table.path).unwrap(), "txId,label\n7,1\n");
        assert!(!dir.path().join("out/.x.csv.tmp").exists());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Table::read("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
