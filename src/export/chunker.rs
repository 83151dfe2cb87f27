//! Part slicing
//!
//! [`PartReader`] turns a byte source into the ordered part sequence the
//! relay transport accepts: consecutive, non-overlapping slices of at most
//! `chunk_size` bytes, the final one possibly shorter. The sequence is
//! lazy, finite, and non-restartable, and the total part count is known
//! only after the source is exhausted — sources of not-yet-known length
//! need no special handling. Dropping the reader drops the source, so an
//! underlying file handle is released on every exit path.

use tokio::io::{AsyncRead, AsyncReadExt};

/// One slice of the source, ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub index: u32,
    pub bytes: Vec<u8>,
}

/// Lazy part producer over an async byte source
pub struct PartReader<R> {
    source: R,
    chunk_size: usize,
    next_index: u32,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> PartReader<R> {
    pub fn new(source: R, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");

        Self {
            source,
            chunk_size,
            next_index: 0,
            exhausted: false,
        }
    }

    /// Read the next part. Returns `None` once the source is exhausted, and
    /// keeps returning `None` afterwards.
    pub async fn next_part(&mut self) -> std::io::Result<Option<Part>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;

        while filled < self.chunk_size {
            let n = self.source.read(&mut buf[filled..]).await?;
            if n == 0 {
                self.exhausted = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }

        buf.truncate(filled);

        let part = Part {
            index: self.next_index,
            bytes: buf,
        };
        self.next_index += 1;

        Ok(Some(part))
    }

    /// Parts produced so far; the final count once exhausted
    pub fn parts_produced(&self) -> u32 {
        self.next_index
    }
}
