//! The schema-partitioned message archive.
//!
//! Every feed message is logged verbatim, one line per message, one file
//! per schema. The archive is append-only; rotation is left to the host.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use rampart_core::Result;

/// Line-delimited verbatim logs under a base directory.
pub struct SchemaArchive {
    dir: PathBuf,
}

impl SchemaArchive {
    /// An archive rooted at `dir`; the directory is created on first use.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// File name for a schema reference: the URL mangled to a safe stem.
    fn file_for(&self, schema_ref: &str) -> PathBuf {
        let stem: String = schema_ref
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{stem}.jsonl"))
    }

    /// Append one raw message line to its schema's log.
    pub fn append(&self, schema_ref: &str, raw: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file =
            OpenOptions::new().create(true).append(true).open(self.file_for(schema_ref))?;
        file.write_all(raw.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}
