//! Shared-memory rendezvous hub: a matrix of slots and a cyclic barrier.
//!
//! A round runs in three barrier-separated phases:
//! 1. every partition writes its row (`slot[from][*]`);
//! 2. every partition reads its column (`slot[*][to]`) and the global
//!    "anything sent" flag;
//! 3. every partition clears its row, and partition 0 resets the flag.
//!
//! The third barrier keeps round N+1 writes after round N cleanup. The
//! per-slot mutexes are never contended: the barrier orders all accesses.
//!
//! A partition that fails can [`Exchange::abort`] the hub; every waiting and
//! future round then returns [`Aborted`] instead of blocking forever.

use parcheck_model::PartitionId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// The hub was aborted by one of its partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

#[derive(Debug, Default)]
struct Generation {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

/// Reusable barrier that can be torn down.
#[derive(Debug)]
struct Rendezvous {
    count: usize,
    state: Mutex<Generation>,
    wake: Condvar,
}

impl Rendezvous {
    fn new(count: usize) -> Self {
        Self {
            count,
            state: Mutex::new(Generation::default()),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Generation> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait(&self) -> Result<(), Aborted> {
        let mut state = self.lock();
        if state.aborted {
            return Err(Aborted);
        }
        state.arrived += 1;
        if state.arrived == self.count {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.wake.notify_all();
            return Ok(());
        }
        let generation = state.generation;
        while state.generation == generation && !state.aborted {
            state = self.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        if state.generation == generation {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    fn abort(&self) {
        self.lock().aborted = true;
        self.wake.notify_all();
    }

    fn is_aborted(&self) -> bool {
        self.lock().aborted
    }
}

/// Hub shared by all endpoints of one run.
#[derive(Debug)]
pub struct Exchange<T> {
    count: usize,
    slots: Vec<Mutex<Option<T>>>,
    barrier: Rendezvous,
    sent: AtomicBool,
}

impl<T: Send> Exchange<T> {
    pub fn new(count: usize) -> Self {
        let mut slots = Vec::with_capacity(count * count);
        slots.resize_with(count * count, || Mutex::new(None));
        Self {
            count,
            slots,
            barrier: Rendezvous::new(count),
            sent: AtomicBool::new(false),
        }
    }

    pub fn partition_count(&self) -> usize {
        self.count
    }

    #[inline]
    fn slot(&self, from: PartitionId, to: PartitionId) -> MutexGuard<'_, Option<T>> {
        self.slots[from * self.count + to]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one round as partition `from`. `outgoing` must have one entry per
    /// partition.
    ///
    /// Returns `None` when every partition submitted only `None`; otherwise
    /// the payloads addressed to `from`, in sender order.
    pub fn round(&self, from: PartitionId, outgoing: Vec<Option<T>>) -> Result<Option<Vec<T>>, Aborted> {
        debug_assert_eq!(outgoing.len(), self.count);

        for (to, payload) in outgoing.into_iter().enumerate() {
            if payload.is_some() {
                self.sent.store(true, Ordering::Release);
            }
            *self.slot(from, to) = payload;
        }
        self.barrier.wait()?;

        let any_sent = self.sent.load(Ordering::Acquire);
        let received = any_sent.then(|| {
            (0..self.count)
                .filter_map(|sender| self.slot(sender, from).take())
                .collect()
        });
        self.barrier.wait()?;

        for to in 0..self.count {
            self.slot(from, to).take();
        }
        if from == 0 {
            self.sent.store(false, Ordering::Release);
        }
        self.barrier.wait()?;

        Ok(received)
    }

    /// Release every partition blocked in a round, now and in the future.
    pub fn abort(&self) {
        self.barrier.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.barrier.is_aborted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_single_participant() {
        let hub = Exchange::<u32>::new(1);
        assert_eq!(hub.round(0, vec![None]), Ok(None));
        assert_eq!(hub.round(0, vec![Some(7)]), Ok(Some(vec![7])));
        assert_eq!(hub.round(0, vec![None]), Ok(None));
    }

    #[test]
    fn test_rounds_do_not_leak() {
        let hub = Arc::new(Exchange::<usize>::new(3));
        let handles: Vec<_> = (0..3)
            .map(|id| {
                let hub = Arc::clone(&hub);
                thread::spawn(move || {
                    // Round 1: partition 0 sends to 2.
                    let out = (0..3).map(|to| (id == 0 && to == 2).then_some(100)).collect();
                    let r1 = hub.round(id, out).unwrap();
                    // Round 2: nobody sends.
                    let r2 = hub.round(id, vec![None, None, None]).unwrap();
                    // Round 3: everybody sends its id to partition 1.
                    let out = (0..3).map(|to| (to == 1).then_some(id)).collect();
                    let r3 = hub.round(id, out).unwrap();
                    (id, r1, r2, r3)
                })
            })
            .collect();

        for h in handles {
            let (id, r1, r2, r3) = h.join().unwrap();
            match id {
                2 => assert_eq!(r1, Some(vec![100])),
                _ => assert_eq!(r1, Some(vec![])),
            }
            assert_eq!(r2, None);
            match id {
                1 => assert_eq!(r3, Some(vec![0, 1, 2])),
                _ => assert_eq!(r3, Some(vec![])),
            }
        }
    }

    #[test]
    fn test_abort_releases_waiters() {
        let hub = Arc::new(Exchange::<u8>::new(2));
        let waiter = {
            let hub = Arc::clone(&hub);
            thread::spawn(move || hub.round(0, vec![None, None]))
        };
        hub.abort();
        assert_eq!(waiter.join().unwrap(), Err(Aborted));
        assert!(hub.is_aborted());
        assert_eq!(hub.round(1, vec![None, None]), Err(Aborted));
    }
}
