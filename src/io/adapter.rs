use super::byte_source::{ByteSource, check_extent};
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Mutex;

/// Wraps a stateful `Read + Seek` stream into a [`ByteSource`].
///
/// Every positioned read seeks first, so the wrapped stream's cursor is
/// private to this adapter. Reads are serialised through a mutex.
pub struct SeekSource<R> {
    inner: Mutex<R>,
    len: u64,
}

impl<R: Read + Seek> SeekSource<R> {
    pub fn new(mut inner: R) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner: Mutex::new(inner),
            len,
        })
    }

    /// Current position of the wrapped stream (`tell`).
    pub fn tell(&self) -> io::Result<u64> {
        let mut inner = self.lock()?;
        inner.stream_position()
    }

    pub fn into_inner(self) -> R {
        match self.inner.into_inner() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, R>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("byte source lock poisoned"))
    }
}

impl<R: Read + Seek + Send> ByteSource for SeekSource<R> {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        check_extent(self.len, offset, buf.len())?;
        let mut inner = self.lock()?;
        inner.seek(SeekFrom::Start(offset))?;
        inner.read_exact(buf)
    }
}
