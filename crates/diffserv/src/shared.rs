//! Conditioner shared between threads.
//!
//! Meter updates are read-modify-write on the token counters, so a
//! conditioner used from several threads is serialized behind one mutex.
//! Separate conditioners (one per interface and direction) need no
//! coordination.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::conditioner::{ConditionerStats, Disposition, Outcome, TrafficConditioner};
use crate::packet::Packet;

/// A cloneable handle to a [`TrafficConditioner`] behind a mutex.
///
/// # Example
///
/// ```
/// use std::thread;
/// use diffserv::conditioner::TrafficConditioner;
/// use diffserv::packet::Packet;
/// use diffserv::shared::SharedConditioner;
///
/// let shared = SharedConditioner::new(TrafficConditioner::builder().build()?);
/// let workers: Vec<_> = (0..4)
///     .map(|_| {
///         let tc = shared.clone();
///         thread::spawn(move || tc.condition(Packet::Other { byte_length: 64 }))
///     })
///     .collect();
/// for worker in workers {
///     worker.join().unwrap();
/// }
/// assert_eq!(shared.stats().received, 4);
/// # Ok::<(), diffserv::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct SharedConditioner {
    inner: Arc<Mutex<TrafficConditioner>>,
}

impl SharedConditioner {
    /// Wrap a conditioner.
    pub fn new(conditioner: TrafficConditioner) -> Self {
        Self {
            inner: Arc::new(Mutex::new(conditioner)),
        }
    }

    // Packet processing cannot leave the conditioner half updated, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, TrafficConditioner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Condition a packet at the current clock time.
    pub fn condition(&self, packet: Packet) -> Outcome {
        self.lock().condition(packet)
    }

    /// Condition a packet arriving at `now`.
    pub fn process(&self, packet: Packet, now: Duration) -> Disposition {
        self.lock().process(packet, now)
    }

    /// Snapshot of the packet counters.
    pub fn stats(&self) -> ConditionerStats {
        self.lock().stats().clone()
    }

    /// Run `f` with exclusive access to the conditioner.
    pub fn with<R>(&self, f: impl FnOnce(&mut TrafficConditioner) -> R) -> R {
        f(&mut self.lock())
    }
}

impl From<TrafficConditioner> for SharedConditioner {
    fn from(conditioner: TrafficConditioner) -> Self {
        Self::new(conditioner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionRule, DscpSet};
    use crate::clock::ManualClock;
    use crate::meter::{MeterParams, TokenBucketParams};
    use crate::types::Color;
    use std::thread;

    #[test]
    fn test_meter_state_is_serialized() {
        // 100 packets of 1000 bits fit exactly; the clock never advances.
        let tc = TrafficConditioner::builder()
            .meter(
                "tb",
                MeterParams::TokenBucket(TokenBucketParams {
                    cir: 0.0,
                    cbs: 100_000,
                }),
            )
            .traffic_profile(DscpSet::All, "tb")
            .action(ActionRule::drop(DscpSet::All, Color::RED))
            .clock(ManualClock::new())
            .build()
            .unwrap();
        let shared = SharedConditioner::from(tc);

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let tc = shared.clone();
                thread::spawn(move || {
                    (0..25)
                        .filter(|_| !tc.condition(Packet::Other { byte_length: 125 }).is_drop())
                        .count()
                })
            })
            .collect();
        let forwarded: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();

        assert_eq!(forwarded, 100);
        let stats = shared.stats();
        assert_eq!(stats.received, 200);
        assert_eq!(stats.dropped, 100);
        assert_eq!(shared.with(|tc| tc.stats().color(Color::GREEN)), 100);
    }
}
