//! Request admission gate.
//!
//! Every API request must hold a [`RequestPermit`] while it runs. Once
//! [`AdmissionGate::begin_shutdown`] is called, new requests are refused.
//! [`AdmissionGate::wait_drained`] resolves when the last permit is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Debug)]
struct GateInner {
    accepting: AtomicBool,
    in_flight: AtomicUsize,
    drained: Notify,
}

/// Shared admission state. Cloning yields another handle to the same gate.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionGate {
    /// Create an open gate.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GateInner {
                accepting: AtomicBool::new(true),
                in_flight: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    /// Admit one request, or `None` if the gate is closed.
    pub fn try_admit(&self) -> Option<RequestPermit> {
        // Count first so a concurrent shutdown cannot miss this request.
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let permit = RequestPermit {
            inner: Arc::clone(&self.inner),
        };
        if self.inner.accepting.load(Ordering::SeqCst) {
            Some(permit)
        } else {
            drop(permit);
            None
        }
    }

    /// Stop admitting requests.
    ///
    /// Returns `true` for the call that actually closed the gate.
    pub fn begin_shutdown(&self) -> bool {
        let was_open = self.inner.accepting.swap(false, Ordering::SeqCst);
        if was_open {
            tracing::info!(
                in_flight = self.in_flight(),
                "admission gate closed, draining requests"
            );
        }
        was_open
    }

    /// Whether new requests are admitted.
    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    /// Number of requests currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until no request holds a permit.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.inner.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Proof of admission. Dropping it releases the request's slot.
#[derive(Debug)]
pub struct RequestPermit {
    inner: Arc<GateInner>,
}

impl Drop for RequestPermit {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}
