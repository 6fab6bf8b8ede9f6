use std::path::{Path, PathBuf};

/// What to do with a line whose price or timestamp is present but unparseable.
/// Envelope failures (bad outer JSON) are always skipped regardless.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MalformedFieldPolicy {
    /// Drop the line, log a warning, keep going.
    #[default]
    Skip,
    /// Fail the enclosing input unit.
    Abort,
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub input_root: PathBuf,
    pub extensions: Vec<String>,    // lowercase, no leading dot
    pub batch_size: usize,          // documents per raw-store insert
    pub malformed_fields: MalformedFieldPolicy,
    pub output_path: PathBuf,
    pub pretty: bool,               // pretty-print the exported array
    pub progress: bool,             // show progress bars
    pub progress_label: Option<String>,

    // IO tuning
    pub read_buffer_bytes: usize,   // BufReader capacity over the decoder
    pub write_buffer_bytes: usize,  // BufWriter capacity for the export
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("raw-bid-win"),
            extensions: vec!["gz".to_string()],
            batch_size: 1000,
            malformed_fields: MalformedFieldPolicy::Skip,
            output_path: PathBuf::from("result_dump.json"),
            pretty: false,
            progress: true,
            progress_label: None,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl PipelineOptions {
    pub fn with_input_root(mut self, dir: impl AsRef<Path>) -> Self {
        self.input_root = dir.as_ref().to_path_buf();
        self
    }
    /// Accepts `"gz"`, `".gz"` or `"GZ"`; empty entries are dropped.
    pub fn with_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut v: Vec<String> = exts
            .into_iter()
            .map(|s| s.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        v.sort();
        v.dedup();
        self.extensions = v;
        self
    }
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }
    pub fn with_malformed_fields(mut self, policy: MalformedFieldPolicy) -> Self {
        self.malformed_fields = policy;
        self
    }
    pub fn with_output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.output_path = path.as_ref().to_path_buf();
        self
    }
    pub fn with_pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }

    // IO buffers tuning
    pub fn with_io_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_io_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }
}
