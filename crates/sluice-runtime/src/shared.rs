//! Reference-counted handles for resources that cross into worker threads.
//!
//! A work item never takes raw ownership of a connection or result set.
//! It clones a [`Shared`] handle instead, so the resource outlives the script
//! variable that created it for as long as the item is queued or running.
//! The count decides when the resource is torn down, not the scope of any
//! single thread's variable: `Drop` of the inner value runs exactly once,
//! when the last holder is released.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub struct Shared<T: ?Sized> {
    inner: Arc<T>,
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }
}

impl<T: ?Sized> Shared<T> {
    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }

    pub fn into_arc(self) -> Arc<T> {
        self.inner
    }

    /// Number of live holders, including this one
    pub fn holders(this: &Self) -> usize {
        Arc::strong_count(&this.inner)
    }

    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("holders", &Arc::strong_count(&self.inner))
            .field("value", &&*self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_teardown_runs_once_at_last_release() {
        let drops = Arc::new(AtomicUsize::new(0));
        let a = Shared::new(DropCounter(drops.clone()));
        let b = a.clone();
        let c = b.clone();
        assert_eq!(Shared::holders(&a), 3);

        drop(a);
        drop(b);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(c);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_holder_on_other_thread_keeps_value_alive() {
        let drops = Arc::new(AtomicUsize::new(0));
        let script_side = Shared::new(DropCounter(drops.clone()));
        let in_flight = script_side.clone();
        let (tx, rx) = crossbeam_channel::bounded::<()>(0);

        let worker = std::thread::spawn(move || {
            rx.recv().ok();
            let _keep = in_flight;
        });

        drop(script_side);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        tx.send(()).ok();
        worker.join().ok();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
