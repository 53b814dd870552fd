//! Window-based flow control accounting (§4.5/§5.2): each side tracks
//! how many bytes of `CHANNEL_DATA`/`CHANNEL_EXTENDED_DATA` the other is
//! still allowed to send, topping it up with `CHANNEL_WINDOW_ADJUST`
//! before it runs dry.

use std::sync::atomic::{AtomicU32, Ordering};

use futures::task;

/// Accounting for how much the peer may still send us before we must
/// send a `CHANNEL_WINDOW_ADJUST`.
pub(crate) struct LocalWindow {
    inner: AtomicU32,
}

impl LocalWindow {
    const ADJUST_THRESHOLD: u32 = crate::WINDOW_ADJUST_THRESHOLD;

    /// If the window has drained past the adjustment threshold, resets
    /// it to its initial size and returns how much was added.
    pub fn adjustable(&self) -> Option<u32> {
        let previous = self
            .inner
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |window| {
                if window <= Self::ADJUST_THRESHOLD {
                    Some(crate::INITIAL_WINDOW_SIZE)
                } else {
                    None
                }
            })
            .ok();

        previous.map(|previous| crate::INITIAL_WINDOW_SIZE - previous)
    }

    pub fn consume(&self, size: u32) {
        let previous = self.inner.fetch_sub(size, Ordering::SeqCst);

        // This is a really unexpected case which would only happen with
        // non-compliant peers.
        #[allow(clippy::panic)]
        if size > previous {
            panic!(
                "peer sent more data than the window size allowed, by {} bytes",
                size - previous
            );
        }
    }
}

impl Default for LocalWindow {
    fn default() -> Self {
        Self {
            inner: crate::INITIAL_WINDOW_SIZE.into(),
        }
    }
}

/// Accounting for how much we may still send the peer before we must
/// wait for a `CHANNEL_WINDOW_ADJUST`.
pub(crate) struct RemoteWindow {
    inner: AtomicU32,
    waker: task::AtomicWaker,
}

impl RemoteWindow {
    pub fn replenish(&self, bytes_to_add: u32) {
        self.inner.fetch_add(bytes_to_add, Ordering::SeqCst);
        self.waker.wake();
    }

    fn try_reserve(&self, mut amount: u32) -> Option<u32> {
        let reserved = self
            .inner
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |window| {
                if amount <= window {
                    Some(window - amount)
                } else {
                    amount = window;

                    if amount > 0 {
                        Some(0)
                    } else {
                        None
                    }
                }
            })
            .is_ok();

        if reserved {
            Some(amount)
        } else {
            None
        }
    }

    pub fn poll_reserve(&self, cx: &mut task::Context, amount: u32) -> task::Poll<u32> {
        if let Some(size) = self.try_reserve(amount) {
            task::Poll::Ready(size)
        } else {
            tracing::trace!("peer channel window is full, awaiting an extension");

            self.waker.register(cx.waker());
            task::Poll::Pending
        }
    }
}

impl From<u32> for RemoteWindow {
    fn from(value: u32) -> Self {
        Self {
            inner: value.into(),
            waker: Default::default(),
        }
    }
}
