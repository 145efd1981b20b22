//! Lock-free resource pool.
//!
//! Acquire pops an idle instance or manufactures a new one; it never waits
//! for another caller. The returned guard puts the instance back when it is
//! dropped, which covers early returns, `?` propagation and unwinding.

use std::ops::{Deref, DerefMut};

use crossbeam_queue::SegQueue;

use crate::error::EngineResult;

/// Concurrent free-list of reusable instances.
#[derive(Debug)]
pub struct ResourcePool<T> {
    name: &'static str,
    idle: SegQueue<T>,
    max_idle: Option<usize>,
}

impl<T> ResourcePool<T> {
    /// Creates an unbounded pool.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            idle: SegQueue::new(),
            max_idle: None,
        }
    }

    /// Creates a pool that keeps at most `max_idle` idle instances.
    /// Surplus instances are dropped on release.
    #[must_use]
    pub fn with_max_idle(name: &'static str, max_idle: usize) -> Self {
        Self {
            max_idle: Some(max_idle),
            ..Self::new(name)
        }
    }

    /// Takes an idle instance, or calls `manufacture` when none is idle.
    ///
    /// # Errors
    ///
    /// Propagates the error from `manufacture`.
    pub fn acquire_with<F>(&self, manufacture: F) -> EngineResult<Pooled<'_, T>>
    where
        F: FnOnce() -> EngineResult<T>,
    {
        let item = match self.idle.pop() {
            Some(item) => item,
            None => {
                tracing::trace!(pool = self.name, "pool miss, manufacturing instance");
                manufacture()?
            }
        };
        Ok(Pooled {
            pool: self,
            item: Some(item),
        })
    }

    /// Number of idle instances.
    #[must_use]
    pub fn available(&self) -> usize {
        self.idle.len()
    }

    fn release(&self, item: T) {
        if let Some(max_idle) = self.max_idle {
            if self.idle.len() >= max_idle {
                tracing::trace!(pool = self.name, "pool full, dropping instance");
                return;
            }
        }
        self.idle.push(item);
    }
}

/// Exclusive loan of a pooled instance.
#[derive(Debug)]
pub struct Pooled<'a, T> {
    pool: &'a ResourcePool<T>,
    item: Option<T>,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `drop` takes the item out.
        match &self.item {
            Some(item) => item,
            None => unreachable!("pooled item accessed after release"),
        }
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.item {
            Some(item) => item,
            None => unreachable!("pooled item accessed after release"),
        }
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::EngineError;

    fn use_instance(pool: &ResourcePool<Vec<u8>>, fail: bool) -> EngineResult<usize> {
        let mut buffer = pool.acquire_with(|| Ok(Vec::new()))?;
        buffer.clear();
        buffer.extend_from_slice(b"work");
        if fail {
            return Err(EngineError::malformed("induced failure"));
        }
        Ok(buffer.len())
    }

    #[test]
    fn miss_manufactures_and_release_returns() {
        let pool = ResourcePool::new("test");
        assert_eq!(pool.available(), 0);
        {
            let _guard = pool.acquire_with(|| Ok(1u32)).expect("acquire");
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn idle_instance_is_reused() {
        let pool = ResourcePool::new("test");
        drop(pool.acquire_with(|| Ok(7u32)).expect("acquire"));

        let guard = pool
            .acquire_with(|| Err(EngineError::internal("should not manufacture")))
            .expect("reuse");
        assert_eq!(*guard, 7);
    }

    #[test]
    fn manufacture_failure_is_propagated() {
        let pool: ResourcePool<u32> = ResourcePool::new("test");
        let result = pool.acquire_with(|| Err(EngineError::configuration("no parser")));
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn max_idle_caps_retained_instances() {
        let pool = ResourcePool::with_max_idle("test", 1);
        let a = pool.acquire_with(|| Ok(1u32)).expect("a");
        let b = pool.acquire_with(|| Ok(2u32)).expect("b");
        drop(a);
        drop(b);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn induced_failures_do_not_leak_under_concurrency() {
        const THREADS: usize = 8;
        const ITERATIONS: usize = 200;

        let pool = ResourcePool::new("test");
        let warm: Vec<_> = (0..THREADS)
            .map(|_| pool.acquire_with(|| Ok(Vec::new())).expect("warm"))
            .collect();
        drop(warm);
        let baseline = pool.available();
        assert_eq!(baseline, THREADS);

        let failures = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for i in 0..ITERATIONS {
                        if use_instance(&pool, i % 2 == 1).is_err() {
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert_eq!(failures.load(Ordering::Relaxed), THREADS * ITERATIONS / 2);
        assert_eq!(pool.available(), baseline);
    }

    #[test]
    fn panic_while_borrowed_still_releases() {
        let pool = ResourcePool::new("test");
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = pool.acquire_with(|| Ok(0u8)).expect("acquire");
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(pool.available(), 1);
    }
}
