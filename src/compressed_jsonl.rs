//! Streaming line reader over compressed JSONL input units.
//! The codec is picked from the file extension; decoding is lazy and line-at-a-time.

use crate::util::open_with_backoff;
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Container format of an input unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputCodec {
    /// `.gz`; concatenated members are read through.
    Gzip,
    /// `.zst`
    Zstd,
    /// Anything else is read as plain text.
    Plain,
}

impl InputCodec {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("gz") | Some("gzip") => Self::Gzip,
            Some("zst") | Some("zstd") => Self::Zstd,
            _ => Self::Plain,
        }
    }

    /// Wrap a raw (compressed) byte stream in the matching decoder.
    pub fn decoder<'a, R: Read + 'a>(self, raw: R) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::Gzip => Box::new(MultiGzDecoder::new(raw)),
            Self::Zstd => {
                let mut dec = zstd::stream::read::Decoder::new(raw)?;
                dec.window_log_max(31)?;
                Box::new(dec)
            }
            Self::Plain => Box::new(raw),
        })
    }
}

/// Call `on_line(line_no, line)` for every line of `reader`, top to bottom.
/// Line numbers are 1-based; trailing `\r\n` / `\n` is stripped. Bytes that are
/// not UTF-8 are replaced, so a bad line degrades into a JSON parse failure
/// rather than aborting the unit.
pub fn for_each_line<R: BufRead>(
    mut reader: R,
    mut on_line: impl FnMut(u64, &str) -> Result<()>,
) -> Result<()> {
    let mut buf = Vec::with_capacity(16 * 1024);
    let mut line_no = 0u64;
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        line_no += 1;
        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line_no, &line)?;
    }
    Ok(())
}

/// A `Read` wrapper that counts compressed bytes read.
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Open `path`, decode it per its extension and stream its lines.
/// `on_progress(delta)` receives compressed bytes consumed since the last call,
/// so a byte-sized progress bar over the input files fills up exactly.
pub fn for_each_line_in_file(
    path: &Path,
    read_buf_bytes: usize,
    mut on_progress: impl FnMut(u64),
    mut on_line: impl FnMut(u64, &str) -> Result<()>,
) -> Result<()> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let counter = Arc::new(AtomicU64::new(0));
    let counted = CountingReader { inner: file, counter: counter.clone() };
    let codec = InputCodec::from_path(path);
    let decoder = codec
        .decoder(counted)
        .with_context(|| format!("init {codec:?} decoder for {}", path.display()))?;
    let reader = BufReader::with_capacity(read_buf_bytes.max(8 * 1024), decoder);

    let mut last = 0u64;
    let mut report = |on_progress: &mut dyn FnMut(u64)| {
        let cur = counter.load(Ordering::Relaxed);
        if cur > last {
            on_progress(cur - last);
            last = cur;
        }
    };

    for_each_line(reader, |line_no, line| {
        report(&mut on_progress);
        on_line(line_no, line)
    })
    .with_context(|| format!("reading {}", path.display()))?;

    // final progress flush
    report(&mut on_progress);
    Ok(())
}
