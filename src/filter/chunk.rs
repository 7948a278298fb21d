//! Body units as handed between pipeline stages.
//!
//! # Design Decisions
//! - A chunk either carries payload (memory or file-backed) or is a marker
//! - File-backed chunks are cursors into a shared open file; nothing here reads
//! - Trimming moves a cursor, it never copies bytes

use bytes::{Buf, Bytes};
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::fs::File;
use std::io::{self, SeekFrom};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Ordered run of chunks passed to a single body filter invocation.
pub type ChunkRun = Vec<Chunk>;

/// A byte range `[pos, last)` of an open file.
#[derive(Debug, Clone)]
pub struct FileRegion {
    file: Arc<File>,
    pos: u64,
    last: u64,
}

impl FileRegion {
    pub fn new(file: Arc<File>, pos: u64, last: u64) -> Self {
        debug_assert!(pos <= last);
        Self { file, pos, last }
    }

    /// Current read cursor.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// End of the region (exclusive).
    pub fn last(&self) -> u64 {
        self.last
    }

    pub fn len(&self) -> u64 {
        self.last - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.last
    }

    /// Move the read cursor forward, clamped to the end of the region.
    pub fn advance(&mut self, n: u64) {
        self.pos = self.pos.saturating_add(n).min(self.last);
    }

    /// Stream the region's bytes from disk.
    ///
    /// Seeks before reading. Duplicated descriptors share one file offset,
    /// so regions of the same file must be streamed one at a time.
    pub fn into_stream(self, buf_size: usize) -> BoxStream<'static, io::Result<Bytes>> {
        if self.is_empty() {
            return stream::empty().boxed();
        }

        let len = self.len();
        let open = async move {
            let std_file = self.file.try_clone()?;
            let mut file = tokio::fs::File::from_std(std_file);
            file.seek(SeekFrom::Start(self.pos)).await?;
            Ok::<_, io::Error>(ReaderStream::with_capacity(file.take(len), buf_size))
        };

        stream::once(open).try_flatten().boxed()
    }
}

/// One unit of response body.
#[derive(Debug, Clone)]
pub enum Chunk {
    /// In-memory bytes.
    Memory(Bytes),
    /// Bytes still on disk.
    File(FileRegion),
    /// Flush signal with no payload.
    Flush,
    /// End of body.
    Last,
}

impl Chunk {
    /// Payload length in bytes; markers are zero.
    pub fn len(&self) -> u64 {
        match self {
            Chunk::Memory(bytes) => bytes.len() as u64,
            Chunk::File(region) => region.len(),
            Chunk::Flush | Chunk::Last => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for units that carry no payload and only signal something downstream.
    pub fn is_marker(&self) -> bool {
        matches!(self, Chunk::Flush | Chunk::Last)
    }

    pub fn is_last(&self) -> bool {
        matches!(self, Chunk::Last)
    }

    /// Drop the first `n` payload bytes.
    pub fn advance(&mut self, n: u64) {
        match self {
            Chunk::Memory(bytes) => {
                let n = usize::try_from(n).unwrap_or(usize::MAX).min(bytes.len());
                bytes.advance(n);
            }
            Chunk::File(region) => region.advance(n),
            Chunk::Flush | Chunk::Last => {}
        }
    }

    /// Consume the whole payload, leaving an empty unit.
    pub fn skip_all(&mut self) {
        let len = self.len();
        self.advance(len);
    }

    /// Byte frames for this unit; markers produce none.
    pub fn into_stream(self, file_buf_size: usize) -> BoxStream<'static, io::Result<Bytes>> {
        match self {
            Chunk::Memory(bytes) if bytes.is_empty() => stream::empty().boxed(),
            Chunk::Memory(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            Chunk::File(region) => region.into_stream(file_buf_size),
            Chunk::Flush | Chunk::Last => stream::empty().boxed(),
        }
    }
}

/// Total payload length of a run.
pub fn run_len(run: &[Chunk]) -> u64 {
    run.iter().map(Chunk::len).sum()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Write `data` to a fresh temp file and return it opened for reading.
    pub(crate) fn temp_file(data: &[u8]) -> Arc<File> {
        let path = std::env::temp_dir().join(format!("flv-chunk-{}", uuid::Uuid::new_v4()));
        {
            let mut f = File::create(&path).unwrap();
            f.write_all(data).unwrap();
        }
        let file = File::open(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        Arc::new(file)
    }

    #[test]
    fn test_memory_advance() {
        let mut chunk = Chunk::Memory(Bytes::from_static(b"abcdef"));
        chunk.advance(2);
        assert_eq!(chunk.len(), 4);
        match &chunk {
            Chunk::Memory(b) => assert_eq!(&b[..], b"cdef"),
            _ => panic!("expected memory chunk"),
        }

        chunk.advance(100);
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_file_region_cursor() {
        let file = temp_file(b"0123456789");
        let mut chunk = Chunk::File(FileRegion::new(file, 2, 8));
        assert_eq!(chunk.len(), 6);

        chunk.advance(3);
        match &chunk {
            Chunk::File(r) => {
                assert_eq!(r.pos(), 5);
                assert_eq!(r.last(), 8);
            }
            _ => panic!("expected file chunk"),
        }

        chunk.skip_all();
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_markers_have_no_length() {
        assert!(Chunk::Flush.is_marker());
        assert!(Chunk::Last.is_marker());
        assert_eq!(Chunk::Last.len(), 0);
        assert!(!Chunk::Memory(Bytes::new()).is_marker());
    }

    #[tokio::test]
    async fn test_file_region_reads_range() {
        let file = temp_file(b"0123456789");
        let region = FileRegion::new(file, 3, 7);
        let frames: Vec<Bytes> = region.into_stream(2).try_collect().await.unwrap();
        let joined: Vec<u8> = frames.iter().flat_map(|b| b.iter().copied()).collect();
        assert_eq!(joined, b"3456");
    }
}
