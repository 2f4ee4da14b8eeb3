use std::fmt;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tempfile::TempPath;
use tokio::io::{AsyncRead, ReadBuf};

/// Where the contents of an uploaded file live.
#[derive(Clone)]
pub(crate) enum FileData {
    Memory(Bytes),
    /// Removed from disk once the last handle is dropped.
    Spooled(Arc<TempPath>),
}

impl fmt::Debug for FileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileData::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            FileData::Spooled(path) => write!(f, "Spooled({})", path.display()),
        }
    }
}

impl FileData {
    async fn bytes(&self) -> io::Result<Bytes> {
        match self {
            FileData::Memory(bytes) => Ok(bytes.clone()),
            FileData::Spooled(path) => {
                let path: &Path = path;
                tokio::fs::read(path).await.map(Bytes::from)
            }
        }
    }

    async fn open(&self) -> io::Result<FileStream> {
        match self {
            FileData::Memory(bytes) => Ok(FileStream::memory(bytes.clone())),
            FileData::Spooled(path) => {
                let on_disk: &Path = path;
                let file = tokio::fs::File::open(on_disk).await?;
                Ok(FileStream {
                    inner: StreamInner::Disk {
                        file,
                        _guard: path.clone(),
                    },
                })
            }
        }
    }
}

/// An uploaded file read from a multipart form.
#[derive(Debug, Clone)]
pub struct FormFile {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    len: u64,
    pub(crate) data: FileData,
}

impl FormFile {
    /// Build an in-memory file, e.g. for tests.
    pub fn from_bytes(
        name: impl Into<String>,
        file_name: Option<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        FormFile {
            name: name.into(),
            file_name,
            content_type,
            len: bytes.len() as u64,
            data: FileData::Memory(bytes),
        }
    }

    pub(crate) fn spooled(
        name: String,
        file_name: Option<String>,
        content_type: Option<String>,
        len: u64,
        path: TempPath,
    ) -> Self {
        FormFile {
            name,
            file_name,
            content_type,
            len,
            data: FileData::Spooled(Arc::new(path)),
        }
    }

    /// Name of the form field the file was sent under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name supplied by the client.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Size in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the file contents are held in memory (as opposed to spooled
    /// to a temporary file).
    pub fn is_in_memory(&self) -> bool {
        matches!(self.data, FileData::Memory(_))
    }

    /// Read the whole file.
    pub async fn bytes(&self) -> io::Result<Bytes> {
        self.data.bytes().await
    }

    /// Open the file for incremental reading.
    pub async fn open(&self) -> io::Result<FileStream> {
        self.data.open().await
    }

    /// Re-expose this file as a lazily-read stream.
    pub fn into_stream_file(self) -> StreamFile {
        StreamFile {
            name: self.name,
            file_name: self.file_name,
            content_type: self.content_type,
            len: self.len,
            data: self.data,
        }
    }
}

/// All files uploaded with a request.
#[derive(Debug, Clone, Default)]
pub struct FormFiles {
    files: Vec<FormFile>,
}

impl FormFiles {
    pub fn new(files: Vec<FormFile>) -> Self {
        FormFiles { files }
    }

    /// First file sent under `name` (case-insensitive).
    pub fn get_file(&self, name: &str) -> Option<&FormFile> {
        self.files.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Every file sent under `name` (case-insensitive).
    pub fn get_files(&self, name: &str) -> Vec<&FormFile> {
        self.files
            .iter()
            .filter(|f| f.name.eq_ignore_ascii_case(name))
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FormFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_vec(self) -> Vec<FormFile> {
        self.files
    }
}

impl IntoIterator for FormFiles {
    type Item = FormFile;
    type IntoIter = std::vec::IntoIter<FormFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

/// A file bound in streaming mode.
///
/// Nothing is read until [`open`](StreamFile::open) is called; the returned
/// [`FileStream`] belongs to the handler and is closed by dropping it.
#[derive(Debug, Clone)]
pub struct StreamFile {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    len: u64,
    data: FileData,
}

impl StreamFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub async fn open(&self) -> io::Result<FileStream> {
        self.data.open().await
    }
}

enum StreamInner {
    Memory(io::Cursor<Bytes>),
    Disk {
        file: tokio::fs::File,
        _guard: Arc<TempPath>,
    },
}

/// Readable contents of an uploaded file.
pub struct FileStream {
    inner: StreamInner,
}

impl FileStream {
    pub fn memory(bytes: Bytes) -> Self {
        FileStream {
            inner: StreamInner::Memory(io::Cursor::new(bytes)),
        }
    }
}

impl fmt::Debug for FileStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            StreamInner::Memory(_) => f.write_str("FileStream::Memory"),
            StreamInner::Disk { .. } => f.write_str("FileStream::Disk"),
        }
    }
}

impl AsyncRead for FileStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            StreamInner::Memory(cursor) => Pin::new(cursor).poll_read(cx, buf),
            StreamInner::Disk { file, .. } => Pin::new(file).poll_read(cx, buf),
        }
    }
}
