//! Recyclable proxy references.
//!
//! An [`ObjRef`] is a small mutable value bound to at most one record at a
//! time. Proxies never borrow their pool; rebinding one is a plain field
//! write. Released proxies go back to a [`RefRecycler`] queue so that
//! steady-state traversal creates no new proxies.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender};
use lineage_core::{Handle, PoolError, SlotId};

/// A proxy bound to at most one pool record.
///
/// Two bound proxies are equal when they point at the same slot. An
/// unbound proxy equals nothing, itself included.
#[derive(Debug, Default)]
pub struct ObjRef {
    binding: Option<Handle>,
}

impl ObjRef {
    pub(crate) fn unbound() -> Self {
        Self { binding: None }
    }

    pub(crate) fn bind(&mut self, handle: Handle) {
        self.binding = Some(handle);
    }

    pub(crate) fn unbind(&mut self) {
        self.binding = None;
    }

    /// Whether the proxy is currently bound to a slot.
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// The handle the proxy is bound to.
    pub fn handle(&self) -> Result<Handle, PoolError> {
        self.binding.ok_or(PoolError::InvalidState {
            reason: "proxy is not bound",
        })
    }

    /// The bound slot, without checking that it is still live.
    pub fn slot(&self) -> Option<SlotId> {
        self.binding.map(|h| h.slot())
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        match (self.binding, other.binding) {
            (Some(a), Some(b)) => a.slot() == b.slot(),
            _ => false,
        }
    }
}

/// Multi-producer multi-consumer queue of released proxies.
///
/// Acquire and release take `&self`, so any number of readers sharing a
/// pool can borrow proxies concurrently.
pub struct RefRecycler {
    tx: Sender<ObjRef>,
    rx: Receiver<ObjRef>,
    created: AtomicUsize,
}

impl RefRecycler {
    /// Create an empty recycler.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            created: AtomicUsize::new(0),
        }
    }

    /// Take a released proxy, or make a new one if the queue is empty.
    pub fn acquire(&self) -> ObjRef {
        match self.rx.try_recv() {
            Ok(r) => r,
            Err(_) => {
                self.created.fetch_add(1, Ordering::Relaxed);
                ObjRef::unbound()
            }
        }
    }

    /// Unbind a proxy and queue it for reuse.
    pub fn release(&self, mut r: ObjRef) {
        r.unbind();
        // The receiver lives as long as `self`, so sending cannot fail.
        let _ = self.tx.send(r);
    }

    /// Total number of proxies this recycler has ever created.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of released proxies waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.rx.len()
    }
}

impl Default for RefRecycler {
    fn default() -> Self {
        Self::new()
    }
}
