use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-shot broadcast shutdown signal shared by every stage.
///
/// The signal owns the only sender of a channel that never carries a
/// message. Firing drops that sender, which disconnects the channel and
/// wakes every `select!` waiting on [`CancellationSignal::receiver`] at
/// once. A fired signal can never be reset.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    trigger: Mutex<Option<Sender<Infallible>>>,
    receiver: Receiver<Infallible>,
    fired: AtomicBool,
}

impl CancellationSignal {
    /// Create an unfired signal
    pub fn new() -> Self {
        let (trigger, receiver) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                trigger: Mutex::new(Some(trigger)),
                receiver,
                fired: AtomicBool::new(false),
            }),
        }
    }

    /// Fire the signal. Returns true only for the call that fired it.
    pub fn fire(&self) -> bool {
        let trigger = self.inner.trigger.lock().take();
        match trigger {
            Some(trigger) => {
                self.inner.fired.store(true, Ordering::Release);
                drop(trigger);
                true
            }
            None => false,
        }
    }

    /// Check whether the signal has fired
    pub fn is_cancelled(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once the signal fires.
    ///
    /// Meant for `recv(..)` arms in `crossbeam::channel::select!`.
    pub fn receiver(&self) -> &Receiver<Infallible> {
        &self.inner.receiver
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::TryRecvError;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fire_is_idempotent() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());
        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_clones_observe_fire() {
        let signal = CancellationSignal::new();
        let clone = signal.clone();
        signal.fire();
        assert!(clone.is_cancelled());
        assert!(matches!(
            clone.receiver().try_recv(),
            Err(TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_wakes_all_waiters() {
        let signal = CancellationSignal::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                thread::spawn(move || {
                    let _ = signal.receiver().recv();
                    signal.is_cancelled()
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        signal.fire();

        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }
}
