use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// An open log file with a running byte count.
///
/// The file is always opened in append mode, so reopening a path after a
/// restart continues where the previous process stopped. The writer is the
/// only handle a sink holds on its file; [`FileWriter::close`] consumes it,
/// which makes writing after close or closing twice impossible.
#[derive(Debug)]
pub struct FileWriter {
    /// Path the file was opened at.
    path: PathBuf,
    /// Buffered handle. Unbuffered writers flush after every append.
    inner: BufWriter<File>,
    /// Bytes in the file, including content from before it was opened.
    size: u64,
    /// Whether flushing is deferred.
    buffered: bool,
}

impl FileWriter {
    /// Open `path` for appending, creating it and any missing parent directories.
    pub fn open(path: &Path, buffered: bool) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            path: path.to_path_buf(),
            inner: BufWriter::new(file),
            size,
            buffered,
        })
    }

    /// Append one complete record.
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.size += bytes.len() as u64;
        if !self.buffered {
            self.inner.flush()?;
        }
        Ok(())
    }

    /// Bytes in the file, counting buffered but unflushed data.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path the file was opened at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Push buffered data to the operating system.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Flush, sync to disk and release the handle.
    pub fn close(mut self) -> io::Result<()> {
        self.inner.flush()?;
        self.inner.get_ref().sync_all()
    }
}
