use crate::util::{append_with_backoff, create_with_backoff, open_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Buffered NDJSON reader that decodes one typed document per non-blank line.
pub struct NdjsonReader {
    path: PathBuf,
    rdr: BufReader<File>,
    line_no: u64,
    buf: String,
}

impl NdjsonReader {
    pub fn open(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = open_with_backoff(path, 16, 50)?;
        Ok(Self {
            path: path.to_path_buf(),
            rdr: BufReader::with_capacity(buf_bytes.max(8 * 1024), f),
            line_no: 0,
            buf: String::new(),
        })
    }

    /// Next document, or `None` at EOF. Blank lines are skipped; a line that does
    /// not decode is an error naming the file and line.
    pub fn next_doc<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        loop {
            self.buf.clear();
            let n = self.rdr.read_line(&mut self.buf)?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.buf.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            let doc = serde_json::from_str(line)
                .with_context(|| format!("decode {}:{}", self.path.display(), self.line_no))?;
            return Ok(Some(doc));
        }
    }
}

/// Buffered NDJSON writer; one `serde_json` document per line.
pub struct NdjsonWriter {
    path: PathBuf,
    w: Option<BufWriter<File>>,
}

impl NdjsonWriter {
    /// Truncate (or create) `path`.
    pub fn create(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = create_with_backoff(path, 16, 50)?;
        Ok(Self::wrap(path, f, buf_bytes))
    }

    /// Append to `path`, creating it if missing.
    pub fn append(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = append_with_backoff(path, 16, 50)?;
        Ok(Self::wrap(path, f, buf_bytes))
    }

    fn wrap(path: &Path, f: File, buf_bytes: usize) -> Self {
        Self { path: path.to_path_buf(), w: Some(BufWriter::with_capacity(buf_bytes.max(8 * 1024), f)) }
    }

    pub fn write_doc<T: Serialize>(&mut self, doc: &T) -> Result<()> {
        if let Some(w) = &mut self.w {
            serde_json::to_writer(&mut *w, doc)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Flushes and atomically promotes the temp file to `final_path`.
    pub fn finish_atomic(mut self, final_path: &Path) -> Result<()> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        replace_file_atomic_backoff(&self.path, final_path)
    }
}
