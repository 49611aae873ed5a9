//! Live byte source fed by a producer
//!
//! ```text
//!   AsyncRead ──► pump() ──► LiveFeed::push ──► shared buffer ──► LiveSource
//!                                                (Mutex+Condvar)     request() blocks
//! ```
//!
//! Every received byte is kept so the demuxer can seek back after its mux
//! scan. The producer side closes the feed on drop, which wakes any waiting
//! reader and turns the remaining requests into end of data.

use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use super::ByteSource;
use crate::error::{Error, Result};

/// How often a blocked reader wakes up to check for cancellation
const WAIT_INTERVAL: Duration = Duration::from_millis(100);

/// Read size used by [`pump`]
const PUMP_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Default)]
struct LiveState {
    data: BytesMut,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<LiveState>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a connected feed/source pair
pub fn live_source(name: impl Into<String>) -> (LiveFeed, LiveSource) {
    let shared = Arc::new(Shared::default());
    let feed = LiveFeed {
        shared: shared.clone(),
    };
    let source = LiveSource {
        shared,
        pos: 0,
        name: name.into(),
        cancel: Vec::new(),
    };
    (feed, source)
}

/// Producer half of a live source
#[derive(Debug)]
pub struct LiveFeed {
    shared: Arc<Shared>,
}

impl LiveFeed {
    /// Append received bytes and wake waiting readers
    pub fn push(&self, bytes: &[u8]) {
        let mut state = self.shared.lock();
        if state.closed {
            return;
        }
        state.data.extend_from_slice(bytes);
        self.shared.ready.notify_all();
    }

    /// Mark the stream as finished
    pub fn close(&self) {
        let mut state = self.shared.lock();
        state.closed = true;
        self.shared.ready.notify_all();
    }

    /// Total bytes received so far
    pub fn received(&self) -> u64 {
        self.shared.lock().data.len() as u64
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consumer half of a live source
#[derive(Debug)]
pub struct LiveSource {
    shared: Arc<Shared>,
    pos: u64,
    name: String,
    cancel: Vec<CancellationToken>,
}

impl LiveSource {
    /// Stop waiting for data once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.set_cancellation(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.iter().any(|t| t.is_cancelled())
    }
}

impl ByteSource for LiveSource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancel.push(token);
    }

    fn available(&self) -> u64 {
        (self.shared.lock().data.len() as u64).saturating_sub(self.pos)
    }

    fn request(&mut self, len: u64) -> bool {
        let mut state = self.shared.lock();
        loop {
            if (state.data.len() as u64).saturating_sub(self.pos) >= len {
                return true;
            }
            if state.closed || self.is_cancelled() {
                return false;
            }
            state = self
                .shared
                .ready
                .wait_timeout(state, WAIT_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.pos = offset;
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len() as u64;
        if len == 0 {
            return Ok(());
        }
        if !self.request(len) {
            return Err(Error::insufficient(len, self.available()));
        }
        let state = self.shared.lock();
        let start = self.pos as usize;
        buf.copy_from_slice(&state.data[start..start + buf.len()]);
        drop(state);
        self.pos += len;
        Ok(())
    }
}

/// Drain `reader` into `feed` until end of stream, then close the feed.
///
/// Returns the number of bytes forwarded. On a read error the feed is closed
/// as well (by drop) and the error is returned.
pub async fn pump<R>(mut reader: R, feed: LiveFeed) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; PUMP_CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        feed.push(&buf[..n]);
        total += n as u64;
    }
    tracing::debug!(bytes = total, "Live feed finished");
    feed.close();
    Ok(total)
}
