//! Append-only JSON Lines writer for the raw and text views.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::HarvestError;
use crate::record::PostRecord;

fn open_append(path: &Path) -> Result<BufWriter<File>, HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

fn write_line<T: Serialize>(writer: &mut BufWriter<File>, value: &T) -> Result<(), HarvestError> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Raw writer plus an optional text-view writer. Both are flushed after
/// every record so an interrupted run loses at most the in-flight line.
pub struct JsonlSink {
    raw_path: PathBuf,
    raw: BufWriter<File>,
    text: Option<BufWriter<File>>,
    written: usize,
}

impl JsonlSink {
    pub fn open(raw_path: &Path, text_path: Option<&Path>) -> Result<Self, HarvestError> {
        let raw = open_append(raw_path)?;
        let text = text_path.map(open_append).transpose()?;
        Ok(Self {
            raw_path: raw_path.to_path_buf(),
            raw,
            text,
            written: 0,
        })
    }

    pub fn write(&mut self, record: &PostRecord) -> Result<(), HarvestError> {
        write_line(&mut self.raw, record)?;
        if let Some(text) = self.text.as_mut() {
            write_line(text, &record.text_view())?;
        }
        self.written += 1;
        Ok(())
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    /// Records written through this sink since it was opened.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn close(mut self) -> Result<(), HarvestError> {
        self.raw.flush()?;
        if let Some(text) = self.text.as_mut() {
            text.flush()?;
        }
        Ok(())
    }
}
