//! Flat-file store: one JSON Lines file per table, one JSON string per line.

use super::{validate_table, HistoryStore, WriteMode};
use crate::error::HistoryError;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", table))
    }

    /// Reads decodable entries and reports whether the file ends cleanly.
    fn read_entries(path: &Path) -> Result<(Vec<String>, bool), HistoryError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((Vec::new(), true)),
            Err(e) => return Err(e.into()),
        };
        let ends_with_newline = bytes.last().map_or(true, |b| *b == b'\n');

        let mut entries = Vec::new();
        for (line_no, line) in bytes.split(|b| *b == b'\n').enumerate() {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<String>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    "Skipping corrupt history line {} in {:?}: {}",
                    line_no + 1,
                    path,
                    e
                ),
            }
        }
        Ok((entries, ends_with_newline))
    }

    fn write_lines<W: Write>(writer: &mut W, entries: &[&String]) -> Result<(), HistoryError> {
        for entry in entries {
            serde_json::to_writer(&mut *writer, entry)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl HistoryStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn read_all(&self, table: &str) -> Result<Vec<String>, HistoryError> {
        validate_table(table)?;
        let (entries, _) = Self::read_entries(&self.path_for(table))?;
        Ok(entries)
    }

    fn write(
        &self,
        table: &str,
        entries: &[String],
        mode: WriteMode,
    ) -> Result<usize, HistoryError> {
        validate_table(table)?;
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(table);

        match mode {
            WriteMode::Replace => {
                let mut seen = HashSet::new();
                let fresh: Vec<&String> = entries.iter().filter(|e| seen.insert(*e)).collect();

                let tmp_path = path.with_extension("jsonl.tmp");
                {
                    let mut writer = BufWriter::new(File::create(&tmp_path)?);
                    Self::write_lines(&mut writer, &fresh)?;
                    writer.flush()?;
                    writer.get_ref().sync_all()?;
                }
                fs::rename(&tmp_path, &path)?;
                trace!("Replaced {:?} with {} entries", path, fresh.len());
                Ok(fresh.len())
            }
            WriteMode::Append => {
                let (stored, ends_with_newline) = Self::read_entries(&path)?;
                let mut seen: HashSet<&String> = stored.iter().collect();
                let fresh: Vec<&String> = entries.iter().filter(|e| seen.insert(*e)).collect();
                if fresh.is_empty() {
                    return Ok(0);
                }

                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                let mut writer = BufWriter::new(file);
                if !ends_with_newline {
                    writer.write_all(b"\n")?;
                }
                Self::write_lines(&mut writer, &fresh)?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
                trace!("Appended {} entries to {:?}", fresh.len(), path);
                Ok(fresh.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(
            store.path_for("h_y"),
            b"\"good\"\n{broken\n\xff\xfe\n\n\"also-good\"\n",
        )
        .unwrap();

        assert_eq!(store.read_all("h_y").unwrap(), vec!["good", "also-good"]);
    }

    #[test]
    fn append_after_truncated_tail_starts_a_new_line() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(store.path_for("h_y"), b"\"first\"\n\"half").unwrap();

        let written = store
            .write("h_y", &["second".to_string()], WriteMode::Append)
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(store.read_all("h_y").unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn replace_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store
            .write("h_n", &["x".to_string(), "x".to_string()], WriteMode::Replace)
            .unwrap();

        assert!(!store.path_for("h_n").with_extension("jsonl.tmp").exists());
        assert_eq!(store.read_all("h_n").unwrap(), vec!["x"]);
    }
}
