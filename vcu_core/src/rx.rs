//! Background CAN receive pump.
//!
//! Spawns a thread that owns one bus controller, drains its receive mailbox
//! and forwards frames through a bounded channel, tracking the last-ok
//! timestamp for watchdog logic. The pump never blocks on the channel: when
//! the consumer falls behind, the newest frame is dropped and counted.
//!
//! Safety: each `CanRxPump` spawns exactly one thread that is shut down when
//! the pump is dropped, preventing thread leaks.

use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use vcu_traits::clock::Clock;
use vcu_traits::{CanBus, CanFrame};

/// Frames buffered between the pump thread and the control loop. Sized for
/// one control tick of worst-case bus load.
const CHANNEL_DEPTH: usize = 64;

pub struct CanRxPump {
    rx: xch::Receiver<CanFrame>,
    last_ok: Arc<AtomicU64>,
    overflows: Arc<AtomicU64>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl CanRxPump {
    /// Poll `bus` at `hz`, forwarding every received frame. Receive errors
    /// are logged and skipped; the consumer watchdogs via `stalled_for`.
    pub fn spawn<B, C>(mut bus: B, hz: u32, clock: C) -> Self
    where
        B: CanBus + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(CHANNEL_DEPTH);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let overflows = Arc::new(AtomicU64::new(0));
        let overflows_clone = overflows.clone();
        let period = Duration::from_micros(crate::util::period_us(hz));
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("rx pump received shutdown signal");
                    break;
                }

                // Drain everything pending before sleeping one period.
                loop {
                    match bus.receive() {
                        Ok(Some(frame)) => {
                            match tx.try_send(frame) {
                                Ok(()) => {}
                                Err(xch::TrySendError::Full(f)) => {
                                    // Consumer fell behind; drop and count.
                                    overflows_clone.fetch_add(1, Ordering::Relaxed);
                                    tracing::debug!(id = f.id, "rx channel full, frame dropped");
                                }
                                Err(xch::TrySendError::Disconnected(_)) => {
                                    tracing::debug!("rx pump consumer disconnected");
                                    return;
                                }
                            }
                            last_ok_clone.store(clock.ms_since(epoch), Ordering::Relaxed);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            tracing::warn!(error = %e, "CAN receive error");
                            break;
                        }
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("rx pump thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            overflows,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Frames dropped because the channel was full when they arrived.
    pub fn overflows(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Non-blocking: every frame received since the last call, in order.
    pub fn drain(&self) -> impl Iterator<Item = CanFrame> + '_ {
        self.rx.try_iter()
    }

    /// Milliseconds of silence relative to `now_ms` on the pump's epoch.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Stall time measured against a real monotonic clock.
    pub fn stalled_for_now(&self) -> u64 {
        let now_ms = {
            let dur = Instant::now().saturating_duration_since(self.epoch);
            (dur.as_millis().min(u128::from(u64::MAX))) as u64
        };
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }
}

impl Drop for CanRxPump {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("rx pump thread joined");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate from Drop.
                    tracing::warn!(?e, "rx pump thread panicked during shutdown");
                }
            }
        }
    }
}
