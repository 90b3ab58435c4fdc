use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MonitorError, Result};

/// Upper bound on bytes consumed by a single poll; the rest is read by
/// the following polls
const MAX_READ_BYTES_PER_POLL: u64 = 1024 * 1024;

/// Longest unterminated line held back; beyond this the bytes are emitted
/// as a line of their own
const MAX_PARTIAL_LINE_BYTES: usize = MAX_READ_BYTES_PER_POLL as usize;

/// Bytes just before the cursor that must still be in place on the next poll
const ANCHOR_LEN: u64 = 64;

/// Incremental reader over a file that another process keeps appending to
pub struct FileTailer {
    path: PathBuf,

    /// Open handle, `None` once closed
    file: Option<File>,

    /// Byte offset of the next unread byte
    offset: u64,

    /// Bytes after the last newline seen so far (an unfinished line)
    partial: Vec<u8>,

    /// Identity of the file that was opened, to detect replacement
    identity: Option<FileIdentity>,

    /// Last bytes before `offset`, to detect a truncate-and-regrow rotation
    anchor: Vec<u8>,
}

impl FileTailer {
    /// Open `path` positioned at end-of-file, so only new content is returned
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(MonitorError::NotFound { path });
        }

        let mut file = open_shared(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => MonitorError::NotFound { path: path.clone() },
            _ => MonitorError::io(&path, e),
        })?;
        let offset = file
            .seek(SeekFrom::End(0))
            .map_err(|e| MonitorError::io(&path, e))?;
        let identity = file.metadata().ok().map(|m| FileIdentity::of(&m));
        let anchor = read_anchor(&mut file, offset).map_err(|e| MonitorError::io(&path, e))?;

        debug!(path = %path.display(), offset, "Tailer opened at end of file");

        Ok(Self {
            path,
            file: Some(file),
            offset,
            partial: Vec::new(),
            identity,
            anchor,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current read position in bytes
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Return the complete lines appended since the previous poll.
    ///
    /// An unterminated trailing line is held back until its newline arrives.
    /// Fails if the file was deleted, replaced or truncated underneath us,
    /// including a truncation the writer has already grown past.
    pub fn poll(&mut self) -> Result<Vec<String>> {
        let Some(file) = self.file.as_mut() else {
            return Ok(Vec::new());
        };

        let metadata = fs::metadata(&self.path).map_err(|e| MonitorError::io(&self.path, e))?;
        if self
            .identity
            .is_some_and(|opened| !opened.same_file(&FileIdentity::of(&metadata)))
        {
            return Err(MonitorError::io(
                &self.path,
                io::Error::other("file was replaced by another file"),
            ));
        }
        if metadata.len() < self.offset {
            return Err(MonitorError::io(
                &self.path,
                io::Error::other(format!(
                    "file was truncated from {} to {} bytes",
                    self.offset,
                    metadata.len()
                )),
            ));
        }

        let anchor = read_anchor(file, self.offset).map_err(|e| MonitorError::io(&self.path, e))?;
        if anchor != self.anchor {
            return Err(MonitorError::io(
                &self.path,
                io::Error::other("file was truncated and rewritten"),
            ));
        }
        if metadata.len() == self.offset {
            return Ok(Vec::new());
        }

        let mut chunk = Vec::new();
        let read = file
            .by_ref()
            .take(MAX_READ_BYTES_PER_POLL)
            .read_to_end(&mut chunk)
            .map_err(|e| MonitorError::io(&self.path, e))?;
        self.offset += read as u64;
        self.anchor.extend_from_slice(&chunk);
        let excess = self.anchor.len().saturating_sub(ANCHOR_LEN as usize);
        self.anchor.drain(..excess);

        debug!(path = %self.path.display(), bytes = read, offset = self.offset, "Tailer read");

        Ok(self.split_lines(&chunk))
    }

    /// Append `chunk` to the pending bytes and drain every complete line.
    /// An unterminated line that outgrows the limit is emitted as is.
    fn split_lines(&mut self, chunk: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(chunk);

        let mut lines = Vec::new();
        if let Some(last_newline) = self.partial.iter().rposition(|&b| b == b'\n') {
            let remainder = self.partial.split_off(last_newline + 1);
            let mut complete = std::mem::replace(&mut self.partial, remainder);
            complete.pop();

            lines.extend(complete.split(|&b| b == b'\n').map(decode_line));
        }

        if self.partial.len() >= MAX_PARTIAL_LINE_BYTES {
            warn!(
                path = %self.path.display(),
                bytes = self.partial.len(),
                "Line exceeds limit without a newline, emitting it split"
            );
            lines.push(decode_line(&std::mem::take(&mut self.partial)));
        }

        lines
    }

    /// Release the file handle; safe to call more than once
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(path = %self.path.display(), "Tailer closed");
        }
        self.partial.clear();
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

fn decode_line(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Read up to `ANCHOR_LEN` bytes ending at `offset`, leaving the cursor at `offset`
fn read_anchor(file: &mut File, offset: u64) -> io::Result<Vec<u8>> {
    let len = offset.min(ANCHOR_LEN);
    let mut anchor = vec![0; len as usize];
    file.seek(SeekFrom::Start(offset - len))?;
    file.read_exact(&mut anchor)?;
    Ok(anchor)
}

impl Drop for FileTailer {
    fn drop(&mut self) {
        self.close();
    }
}

/// Identifies the file behind a path, so a delete-and-recreate is noticed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FileIdentity {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
    #[cfg(not(unix))]
    created: Option<std::time::SystemTime>,
}

impl FileIdentity {
    #[cfg(unix)]
    fn of(metadata: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }

    #[cfg(not(unix))]
    fn of(metadata: &fs::Metadata) -> Self {
        Self {
            created: metadata.created().ok(),
        }
    }

    fn same_file(&self, other: &Self) -> bool {
        self == other
    }
}

/// Open for reading without denying the writer (or log rotation) access
#[cfg(windows)]
fn open_shared(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_SHARE_READ: u32 = 0x0000_0001;
    const FILE_SHARE_WRITE: u32 = 0x0000_0002;
    const FILE_SHARE_DELETE: u32 = 0x0000_0004;

    OpenOptions::new()
        .read(true)
        .share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE)
        .open(path)
}

#[cfg(not(windows))]
fn open_shared(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn append(file: &mut NamedTempFile, text: &str) {
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileTailer::open(dir.path().join("missing.log"));
        assert!(matches!(result, Err(MonitorError::NotFound { .. })));
    }

    #[test]
    fn test_starts_at_end_of_file() {
        let mut file = NamedTempFile::new().unwrap();
        append(&mut file, "old line 1\nold line 2\n");

        let mut tailer = FileTailer::open(file.path()).unwrap();
        assert_eq!(tailer.offset(), 22);
        assert!(tailer.poll().unwrap().is_empty());

        append(&mut file, "new line\n");
        assert_eq!(tailer.poll().unwrap(), vec!["new line"]);
    }

    #[test]
    fn test_no_duplicates_no_drops() {
        let mut file = NamedTempFile::new().unwrap();
        let mut tailer = FileTailer::open(file.path()).unwrap();

        append(&mut file, "a\nb\n");
        assert_eq!(tailer.poll().unwrap(), vec!["a", "b"]);
        assert!(tailer.poll().unwrap().is_empty());

        append(&mut file, "c\n");
        append(&mut file, "d\n");
        assert_eq!(tailer.poll().unwrap(), vec!["c", "d"]);
        assert!(tailer.poll().unwrap().is_empty());
    }

    #[test]
    fn test_partial_line_held_until_newline() {
        let mut file = NamedTempFile::new().unwrap();
        let mut tailer = FileTailer::open(file.path()).unwrap();

        append(&mut file, "complete\nhalf of a ");
        assert_eq!(tailer.poll().unwrap(), vec!["complete"]);

        append(&mut file, "line");
        assert!(tailer.poll().unwrap().is_empty());

        append(&mut file, "\nnext\n");
        assert_eq!(tailer.poll().unwrap(), vec!["half of a line", "next"]);
        assert!(tailer.poll().unwrap().is_empty());
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        let mut tailer = FileTailer::open(file.path()).unwrap();

        append(&mut file, "first\r\n\r\nsecond\n");
        assert_eq!(tailer.poll().unwrap(), vec!["first", "", "second"]);
    }

    #[test]
    fn test_multibyte_split_across_polls() {
        let mut file = NamedTempFile::new().unwrap();
        let mut tailer = FileTailer::open(file.path()).unwrap();

        let bytes = "résumé\n".as_bytes();
        // Split inside the two-byte 'é'
        file.write_all(&bytes[..2]).unwrap();
        file.flush().unwrap();
        assert!(tailer.poll().unwrap().is_empty());

        file.write_all(&bytes[2..]).unwrap();
        file.flush().unwrap();
        assert_eq!(tailer.poll().unwrap(), vec!["résumé"]);
    }

    #[test]
    fn test_truncation_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        append(&mut file, "some existing content\n");
        let mut tailer = FileTailer::open(file.path()).unwrap();

        file.as_file().set_len(0).unwrap();
        assert!(matches!(tailer.poll(), Err(MonitorError::Io { .. })));
    }

    #[test]
    fn test_truncate_then_regrow_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        let mut tailer = FileTailer::open(file.path()).unwrap();

        append(&mut file, "0123456789\n");
        assert_eq!(tailer.poll().unwrap(), vec!["0123456789"]);

        // copytruncate: the writer refills the file past the old offset
        file.as_file().set_len(0).unwrap();
        file.as_file_mut().seek(SeekFrom::Start(0)).unwrap();
        append(&mut file, "NEW first line after rotation\nsecond\n");

        assert!(matches!(tailer.poll(), Err(MonitorError::Io { .. })));
    }

    #[test]
    fn test_anchor_survives_many_polls() {
        let mut file = NamedTempFile::new().unwrap();
        append(&mut file, &"x".repeat(200));
        let mut tailer = FileTailer::open(file.path()).unwrap();

        for i in 0..20 {
            let line = format!("line {i} {}\n", "y".repeat(i * 7));
            append(&mut file, &line);
            assert_eq!(tailer.poll().unwrap(), vec![line.trim_end().to_string()]);
        }
        assert!(tailer.poll().unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_line_is_bounded() {
        let mut file = NamedTempFile::new().unwrap();
        let mut tailer = FileTailer::open(file.path()).unwrap();

        let chunk = vec![b'a'; MAX_PARTIAL_LINE_BYTES / 2];
        for _ in 0..6 {
            file.write_all(&chunk).unwrap();
            file.flush().unwrap();
            for line in tailer.poll().unwrap() {
                assert_eq!(line.len(), MAX_PARTIAL_LINE_BYTES);
            }
            assert!(tailer.partial.len() < MAX_PARTIAL_LINE_BYTES);
        }

        append(&mut file, "tail\n");
        let lines = tailer.poll().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("tail"));
        assert!(tailer.partial.is_empty());
    }

    #[test]
    fn test_deleted_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.log");
        fs::write(&path, "x\n").unwrap();

        let mut tailer = FileTailer::open(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(matches!(tailer.poll(), Err(MonitorError::Io { .. })));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut file = NamedTempFile::new().unwrap();
        let mut tailer = FileTailer::open(file.path()).unwrap();
        tailer.close();
        tailer.close();
        assert!(!tailer.is_open());

        append(&mut file, "ignored\n");
        assert!(tailer.poll().unwrap().is_empty());
    }
}
