//! Cooperative tick scheduler for the control loop.
//!
//! Tasks register with a fixed period in milliseconds and run in
//! registration order inside the caller's loop. The driver derives the
//! current tick from the monotonic clock, so a loop that falls behind shows
//! up as late dispatches; a dispatch two or more periods late counts as an
//! overrun.

use crate::error::ConfigError;
use crate::util::ticks_for_ms;

struct Task<C> {
    name: &'static str,
    period_ticks: u64,
    last_run: u64,
    has_run: bool,
    cb: Box<dyn FnMut(&mut C, u64) + Send>,
}

pub struct Scheduler<C> {
    tasks: Vec<Task<C>>,
    capacity: usize,
    tick_ms: u64,
    overruns: u64,
}

impl<C> Scheduler<C> {
    /// `tick_ms` is the base tick period; `capacity` caps the task table so
    /// a misconfigured build fails at registration, not at runtime.
    pub fn new(tick_ms: u64, capacity: usize) -> Result<Self, ConfigError> {
        if tick_ms == 0 {
            return Err(ConfigError::ZeroPeriod("tick"));
        }
        Ok(Self {
            tasks: Vec::with_capacity(capacity),
            capacity,
            tick_ms,
            overruns: 0,
        })
    }

    pub fn register<F>(
        &mut self,
        name: &'static str,
        period_ms: u64,
        cb: F,
    ) -> Result<(), ConfigError>
    where
        F: FnMut(&mut C, u64) + Send + 'static,
    {
        if period_ms == 0 {
            return Err(ConfigError::ZeroPeriod(name));
        }
        if self.tasks.len() >= self.capacity {
            return Err(ConfigError::TaskTableFull(self.capacity));
        }
        self.tasks.push(Task {
            name,
            period_ticks: ticks_for_ms(period_ms, self.tick_ms),
            last_run: 0,
            has_run: false,
            cb: Box::new(cb),
        });
        Ok(())
    }

    /// Dispatch every task due at `now_tick`, in registration order.
    ///
    /// Every task runs on its first call regardless of phase, so all periods
    /// align to tick zero.
    pub fn run_tick(&mut self, now_tick: u64, ctx: &mut C) {
        for task in &mut self.tasks {
            let due = !task.has_run || now_tick.saturating_sub(task.last_run) >= task.period_ticks;
            if !due {
                continue;
            }
            if task.has_run && now_tick.saturating_sub(task.last_run) >= 2 * task.period_ticks {
                self.overruns += 1;
                tracing::warn!(
                    task = task.name,
                    late_ticks = now_tick - task.last_run - task.period_ticks,
                    "task dispatched late"
                );
            }
            task.last_run = now_tick;
            task.has_run = true;
            (task.cb)(ctx, now_tick);
        }
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Dispatches that arrived at least one full period late.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}
