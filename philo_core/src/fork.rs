//! Fork Registry - the ring of exclusive resources.
//!
//! Each fork is a holder slot behind a short-lived `std::sync::Mutex` plus a
//! `Notify` used to wake waiters when the fork is put down. The slot lock is
//! never held across an `.await`.
//!
//! ```text
//!        P0        P1        P2
//!   F0 ───── F1 ───── F2 ───── F3 ... F(N-1) ───── F0
//! ```
//!
//! Philosopher `i` uses forks `i` and `(i + 1) % N`. [`ForkRegistry::forks_for`]
//! returns them ordered lowest id first, which is the global acquisition
//! order every worker follows.

use crate::error::ForkError;
use philo_env::{ForkId, PhilosopherId};
use std::pin::pin;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// A single fork.
#[derive(Debug, Default)]
struct ForkSlot {
    /// Current holder, `None` when the fork is on the table.
    holder: Mutex<Option<PhilosopherId>>,

    /// Woken on every release.
    released: Notify,
}

impl ForkSlot {
    fn lock(&self) -> MutexGuard<'_, Option<PhilosopherId>> {
        // Every critical section leaves the slot consistent, so a poisoned
        // lock still holds a valid value.
        self.holder.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The N forks of the table.
#[derive(Debug)]
pub struct ForkRegistry {
    slots: Vec<ForkSlot>,
}

impl ForkRegistry {
    /// Creates `n` free forks.
    pub fn new(n: usize) -> Self {
        Self {
            slots: (0..n).map(|_| ForkSlot::default()).collect(),
        }
    }

    /// The two forks adjacent to `philosopher`, lowest id first.
    pub fn forks_for(&self, philosopher: PhilosopherId) -> (ForkId, ForkId) {
        let own = philosopher.own_fork();
        let next = philosopher.next_fork(self.slots.len());
        if own <= next {
            (own, next)
        } else {
            (next, own)
        }
    }

    /// Current holder of `fork`, without blocking.
    pub fn holder(&self, fork: ForkId) -> Result<Option<PhilosopherId>, ForkError> {
        Ok(*self.slot(fork)?.lock())
    }

    /// Takes `fork` for `philosopher` if it is free.
    ///
    /// Returns `Ok(false)` if someone else holds it.
    pub fn try_acquire(&self, fork: ForkId, philosopher: PhilosopherId) -> Result<bool, ForkError> {
        let mut holder = self.slot(fork)?.lock();
        match *holder {
            None => {
                *holder = Some(philosopher);
                Ok(true)
            }
            Some(current) if current == philosopher => Err(ForkError::AlreadyHeld { fork, philosopher }),
            Some(_) => Ok(false),
        }
    }

    /// Waits until `fork` is free and takes it for `philosopher`.
    ///
    /// Returns `ForkError::Cancelled` as soon as `cancel` fires, holding
    /// nothing. Dropping the future before it resolves is safe: the claim
    /// itself is a single synchronous step.
    pub async fn acquire(
        &self,
        fork: ForkId,
        philosopher: PhilosopherId,
        cancel: &CancellationToken,
    ) -> Result<(), ForkError> {
        self.wait_for(fork, cancel, || self.try_acquire(fork, philosopher))
            .await
    }

    /// Waits until `fork` is on the table, without taking it.
    pub async fn wait_released(&self, fork: ForkId, cancel: &CancellationToken) -> Result<(), ForkError> {
        self.wait_for(fork, cancel, || Ok(self.holder(fork)?.is_none()))
            .await
    }

    /// Re-runs `ready` after every release of `fork` until it returns true.
    async fn wait_for<F>(&self, fork: ForkId, cancel: &CancellationToken, mut ready: F) -> Result<(), ForkError>
    where
        F: FnMut() -> Result<bool, ForkError>,
    {
        let slot = self.slot(fork)?;
        loop {
            if cancel.is_cancelled() {
                return Err(ForkError::Cancelled);
            }

            // Register interest before looking, so a release between the
            // check and the await is not lost.
            let mut released = pin!(slot.released.notified());
            released.as_mut().enable();

            if ready()? {
                return Ok(());
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(ForkError::Cancelled),
                _ = released => {}
            }
        }
    }

    /// Puts `fork` back on the table.
    ///
    /// Only the current holder may release a fork.
    pub fn release(&self, fork: ForkId, philosopher: PhilosopherId) -> Result<(), ForkError> {
        let slot = self.slot(fork)?;
        {
            let mut holder = slot.lock();
            if *holder != Some(philosopher) {
                return Err(ForkError::NotHolder {
                    fork,
                    philosopher,
                    holder: *holder,
                });
            }
            *holder = None;
        }
        slot.released.notify_waiters();
        Ok(())
    }

    fn slot(&self, fork: ForkId) -> Result<&ForkSlot, ForkError> {
        self.slots.get(fork.index()).ok_or(ForkError::UnknownFork(fork))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_acquire_release_cycle() {
        let forks = ForkRegistry::new(3);
        let p0 = PhilosopherId(0);
        let p1 = PhilosopherId(1);

        assert!(forks.try_acquire(ForkId(1), p0).unwrap());
        assert_eq!(forks.holder(ForkId(1)).unwrap(), Some(p0));
        assert!(!forks.try_acquire(ForkId(1), p1).unwrap());

        forks.release(ForkId(1), p0).unwrap();
        assert_eq!(forks.holder(ForkId(1)).unwrap(), None);
        assert!(forks.try_acquire(ForkId(1), p1).unwrap());
    }

    #[test]
    fn test_double_acquire_is_violation() {
        let forks = ForkRegistry::new(2);
        let p = PhilosopherId(0);
        forks.try_acquire(ForkId(0), p).unwrap();

        let err = forks.try_acquire(ForkId(0), p).unwrap_err();
        assert_eq!(err, ForkError::AlreadyHeld { fork: ForkId(0), philosopher: p });
        assert!(err.is_violation());
    }

    #[test]
    fn test_release_by_non_holder_is_violation() {
        let forks = ForkRegistry::new(2);
        forks.try_acquire(ForkId(0), PhilosopherId(0)).unwrap();

        let err = forks.release(ForkId(0), PhilosopherId(1)).unwrap_err();
        assert_eq!(
            err,
            ForkError::NotHolder {
                fork: ForkId(0),
                philosopher: PhilosopherId(1),
                holder: Some(PhilosopherId(0)),
            }
        );

        // The rightful holder is untouched.
        assert_eq!(forks.holder(ForkId(0)).unwrap(), Some(PhilosopherId(0)));

        let err = forks.release(ForkId(1), PhilosopherId(1)).unwrap_err();
        assert!(matches!(err, ForkError::NotHolder { holder: None, .. }));
    }

    #[test]
    fn test_unknown_fork() {
        let forks = ForkRegistry::new(2);
        assert_eq!(
            forks.try_acquire(ForkId(2), PhilosopherId(0)),
            Err(ForkError::UnknownFork(ForkId(2)))
        );
    }

    #[test]
    fn test_forks_for_orders_lowest_first() {
        let forks = ForkRegistry::new(5);
        assert_eq!(forks.forks_for(PhilosopherId(0)), (ForkId(0), ForkId(1)));
        assert_eq!(forks.forks_for(PhilosopherId(3)), (ForkId(3), ForkId(4)));
        // The last seat wraps: its lower fork is fork 0.
        assert_eq!(forks.forks_for(PhilosopherId(4)), (ForkId(0), ForkId(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_acquire_wakes_on_release() {
        let forks = Arc::new(ForkRegistry::new(2));
        let cancel = CancellationToken::new();
        forks.try_acquire(ForkId(0), PhilosopherId(0)).unwrap();

        let waiter = {
            let forks = forks.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { forks.acquire(ForkId(0), PhilosopherId(1), &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        forks.release(ForkId(0), PhilosopherId(0)).unwrap();
        waiter.await.unwrap().unwrap();
        assert_eq!(forks.holder(ForkId(0)).unwrap(), Some(PhilosopherId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_unblocks_waiter_holding_nothing() {
        let forks = Arc::new(ForkRegistry::new(2));
        let cancel = CancellationToken::new();
        forks.try_acquire(ForkId(1), PhilosopherId(0)).unwrap();

        let waiter = {
            let forks = forks.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { forks.acquire(ForkId(1), PhilosopherId(1), &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        assert_eq!(waiter.await.unwrap(), Err(ForkError::Cancelled));
        assert_eq!(forks.holder(ForkId(1)).unwrap(), Some(PhilosopherId(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_released_leaves_fork_on_table() {
        let forks = Arc::new(ForkRegistry::new(2));
        let cancel = CancellationToken::new();

        // Already free: returns at once.
        forks.wait_released(ForkId(1), &cancel).await.unwrap();
        assert_eq!(forks.holder(ForkId(1)).unwrap(), None);

        forks.try_acquire(ForkId(1), PhilosopherId(0)).unwrap();
        let waiter = {
            let forks = forks.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { forks.wait_released(ForkId(1), &cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        forks.release(ForkId(1), PhilosopherId(0)).unwrap();
        waiter.await.unwrap().unwrap();
        assert_eq!(forks.holder(ForkId(1)).unwrap(), None);

        assert_eq!(
            forks.wait_released(ForkId(5), &cancel).await,
            Err(ForkError::UnknownFork(ForkId(5)))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mutual_exclusion_under_contention() {
        const CONTENDERS: usize = 8;
        const ROUNDS: usize = 200;

        let forks = Arc::new(ForkRegistry::new(1));
        let cancel = CancellationToken::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for i in 0..CONTENDERS {
            let forks = forks.clone();
            let cancel = cancel.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            tasks.push(tokio::spawn(async move {
                let me = PhilosopherId(i);
                for _ in 0..ROUNDS {
                    forks.acquire(ForkId(0), me, &cancel).await.unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    forks.release(ForkId(0), me).unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(forks.holder(ForkId(0)).unwrap(), None);
    }

    proptest! {
        #[test]
        fn prop_every_fork_shared_by_exactly_two_neighbours(n in 2usize..64) {
            let forks = ForkRegistry::new(n);
            let mut users = vec![0usize; n];
            for i in 0..n {
                let (low, high) = forks.forks_for(PhilosopherId(i));
                prop_assert!(low < high);
                users[low.index()] += 1;
                users[high.index()] += 1;
            }
            prop_assert!(users.iter().all(|&u| u == 2));
        }
    }
}
