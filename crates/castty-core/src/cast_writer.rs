use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use castty_protocol::{CastHeader, Event, write_event_line};
use tracing::debug;

use crate::error::CoreError;

/// Append-only serializer for one cast file. `append` is the only mutating
/// operation after construction; the caller supplies monotone timestamps —
/// the writer does not reorder or deduplicate.
pub struct CastWriter {
    file: Option<BufWriter<File>>,
    path: String,
}

impl CastWriter {
    /// Create the output file (and parent directories), write the header
    /// line, and return a writer ready for `append`.
    pub fn create(path: &Path, header: &CastHeader) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let line = header.to_line()?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        debug!(event = "core.cast_writer.opened", path = %path.display());

        Ok(Self {
            file: Some(writer),
            path: path.display().to_string(),
        })
    }

    /// Serialize and flush one event. A crash after this call loses at most
    /// the line currently being written by the OS, never a prior line.
    pub fn append(&mut self, event: &Event) -> Result<(), CoreError> {
        let writer = self.file.as_mut().ok_or(CoreError::WriterClosed)?;
        let line = write_event_line(event)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Release the file handle. Subsequent `append` calls fail with
    /// `WriterClosed`.
    pub fn close(&mut self) -> Result<(), CoreError> {
        if let Some(mut writer) = self.file.take() {
            writer.flush()?;
            debug!(event = "core.cast_writer.closed", path = %self.path);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

impl Drop for CastWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castty_protocol::EventKind;
    use tempfile::tempdir;

    fn sample_header() -> CastHeader {
        CastHeader::new(80, 24, 1_700_000_000, "/bin/sh", "/bin/sh", "xterm-256color")
    }

    #[test]
    fn writes_header_then_events() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.cast");
        let mut writer = CastWriter::create(&path, &sample_header()).unwrap();
        writer
            .append(&Event::new(0.0, EventKind::Output, "hello\n"))
            .unwrap();
        writer.close().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        let header_line = lines.next().unwrap();
        assert!(header_line.contains("\"version\":2"));
        let event_line = lines.next().unwrap();
        assert!(event_line.contains("hello"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("out.cast");
        let writer = CastWriter::create(&path, &sample_header()).unwrap();
        assert!(path.parent().unwrap().exists());
        drop(writer);
    }

    #[test]
    fn append_after_close_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.cast");
        let mut writer = CastWriter::create(&path, &sample_header()).unwrap();
        writer.close().unwrap();
        let err = writer
            .append(&Event::new(0.0, EventKind::Output, "x"))
            .unwrap_err();
        assert_eq!(err.error_code(), "writer_closed");
    }

    #[test]
    fn double_close_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.cast");
        let mut writer = CastWriter::create(&path, &sample_header()).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());
    }
}
