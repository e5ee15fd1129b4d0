//! Exclusive-use handle around a media
//!
//! Every request/reply exchange holds the guard returned by
//! [`SharedMedia::acquire`] from its first send until its last receive, so
//! two exchanges never interleave on the wire. The guard releases the media
//! when it is dropped, including on early returns and errors.

use crate::error::DlmsResult;
use crate::media::{Media, MediaEventReceiver};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, MutexGuard};

/// Guard giving exclusive access to the media
pub type MediaGuard<'a, M> = MutexGuard<'a, M>;

/// Cloneable handle to a media shared between the reader and its observers
#[derive(Debug)]
pub struct SharedMedia<M> {
    inner: Arc<Mutex<M>>,
}

impl<M> Clone for SharedMedia<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Media> SharedMedia<M> {
    /// Wrap a media
    pub fn new(media: M) -> Self {
        Self {
            inner: Arc::new(Mutex::new(media)),
        }
    }

    /// Wait for exclusive use of the media
    pub async fn acquire(&self) -> MediaGuard<'_, M> {
        self.inner.lock().await
    }

    /// Check if the media is open
    pub async fn is_open(&self) -> bool {
        self.acquire().await.is_open()
    }

    /// Open the media unless it already is
    pub async fn open(&self) -> DlmsResult<()> {
        let mut media = self.acquire().await;
        if !media.is_open() {
            media.open().await?;
        }
        Ok(())
    }

    /// Close the media
    pub async fn close(&self) -> DlmsResult<()> {
        self.acquire().await.close().await
    }

    /// Route the media's trace and error events to a new channel
    ///
    /// Replaces any previous subscription.
    pub async fn subscribe(&self) -> MediaEventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.acquire().await.set_event_sink(Some(tx));
        rx
    }
}
