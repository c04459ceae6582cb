//! The drive session: wiring between acquisition, supervision and the buses.
//!
//! One session owns the pedal machine, the car sequencer, the BMS tracker
//! and the telemetry rotation, and drives them through the tick scheduler.
//! `step` advances exactly one tick so tests can run the whole car
//! deterministically; `run` paces steps off a monotonic clock until asked
//! to shut down.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::bms::BmsTracker;
use crate::error::{Result, VcuError};
use crate::pedal::{Pedal, PedalFault};
use crate::rx::CanRxPump;
use crate::scheduler::Scheduler;
use crate::state::{CarInputs, CarState};
use crate::telemetry::{self, TelemetryRotation, TelemetrySnapshot};
use crate::{curves, util};
use vcu_config::Config;
use vcu_traits::clock::Clock;
use vcu_traits::{CanBus, Inputs};

/// Hall pulses per motor revolution on the reference drivetrain.
const HALL_PULSES_PER_REV: u32 = 6;
/// Wheel circumference in millimetres.
const WHEEL_CIRC_MM: u32 = 1_570;
/// Motor to wheel reduction ratio.
const GEAR_RATIO: u32 = 4;

/// Motor rpm from the hall pulse frequency in Hz.
#[inline]
fn motor_rpm(hall_hz: u16) -> u16 {
    (u32::from(hall_hz) * 60 / HALL_PULSES_PER_REV).min(u32::from(u16::MAX)) as u16
}

/// Vehicle speed in km/h from motor rpm.
#[inline]
fn wheel_speed_kmh(rpm: u16) -> u16 {
    // rpm / gear * circumference(mm) * 60 min/h / 1e6 mm/km
    (u64::from(rpm) * u64::from(WHEEL_CIRC_MM) * 60 / u64::from(GEAR_RATIO) / 1_000_000) as u16
}

/// Everything the scheduler tasks operate on.
struct SessionCtx {
    pedal: Pedal,
    car: CarState,
    bms: BmsTracker,
    rotation: TelemetryRotation,

    inputs: Box<dyn Inputs + Send>,
    /// Motor and BMS traffic.
    motor_bus: Box<dyn CanBus + Send>,
    /// Broadcast telemetry.
    telemetry_bus: Box<dyn CanBus + Send>,
    rx: Option<CanRxPump>,

    snapshot: TelemetrySnapshot,
    last_fault: PedalFault,
    tx_errors: u64,
    failure: Option<crate::error::Report>,
}

impl SessionCtx {
    /// Per-tick control pass: drain the bus, evaluate pedals, advance the
    /// car sequencer, refresh the snapshot.
    fn control(&mut self, tick: u64) {
        if let Some(rx) = &self.rx {
            for frame in rx.drain() {
                self.bms.on_frame(&frame, tick);
            }
        }
        self.bms.tick(tick);

        let sample = match self.inputs.sample() {
            Ok(s) => s,
            Err(e) => {
                self.failure = Some(crate::error::Report::new(VcuError::Hardware(e.to_string())));
                return;
            }
        };

        let status = self
            .pedal
            .evaluate(sample.apps_5v, sample.apps_3v3, sample.brake, tick);

        self.car.update(
            &CarInputs {
                start_button: sample.start_button,
                brake_raw: sample.brake,
                hv_ready: self.bms.hv_ready(),
                force_stop: self.pedal.latched(),
                throttle_pressed: status.torque > 0,
            },
            tick,
        );

        let torque = if self.car.drive_enabled() {
            status.torque
        } else {
            0
        };

        let rpm = motor_rpm(sample.hall);
        self.snapshot = TelemetrySnapshot {
            apps_5v: sample.apps_5v,
            apps_3v3: sample.apps_3v3,
            brake: sample.brake,
            hall: sample.hall,
            motor_rpm: rpm,
            motor_speed: wheel_speed_kmh(rpm),
            apps_3v3_scaled: curves::rescale_apps_3v3(sample.apps_3v3)
                .clamp(0, i32::from(u16::MAX)) as u16,
            torque,
            car_status: self.car.status(),
            state_unknown: self.car.is_unknown(),
            hv_ready: self.bms.hv_ready(),
            bms_status: self.bms.status(),
            bms_wrong_id: self.bms.wrong_id(),
            force_stop: self.car.force_stop(),
            screenshot: status.screenshot,
            fault_bits: status.bits,
            bms_data: self.bms.data(),
        };

        // Fault code and stage changes go out the moment they happen.
        if status.fault != self.last_fault {
            self.last_fault = status.fault;
            let frame = telemetry::throttle_fault(status.fault);
            self.send_telemetry(&frame);
        }
        if let Some((from, to)) = self.car.take_changed() {
            let frame = telemetry::car_change(from, to);
            self.send_telemetry(&frame);
        }
    }

    /// Periodic torque command to the inverter.
    fn motor_tx(&mut self) {
        let frame = telemetry::motor_command(self.snapshot.torque);
        if let Err(e) = self.motor_bus.transmit(&frame) {
            self.tx_errors += 1;
            tracing::warn!(error = %e, "motor command transmit failed");
        }
    }

    /// Periodic telemetry slot plus the low-rate side channels.
    fn telemetry_tx(&mut self) {
        let snap = self.snapshot;
        let rotating = self.rotation.next(&snap);
        self.send_telemetry(&rotating);
        self.send_telemetry(&telemetry::throttle_in(
            snap.apps_5v,
            snap.apps_3v3,
            snap.brake,
        ));
        self.send_telemetry(&telemetry::throttle_out(snap.torque));
        self.send_telemetry(&telemetry::car_status(snap.car_status));
        self.send_telemetry(&telemetry::brake_status(
            snap.brake,
            self.car.brake_pressed(),
        ));
        self.send_telemetry(&telemetry::bms_status(snap.bms_status));
        self.send_telemetry(&telemetry::hall_sensor(snap.hall));
    }

    /// Periodic BMS info poll.
    fn bms_poll(&mut self) {
        if let Some(frame) = self.bms.poll_frame() {
            if let Err(e) = self.motor_bus.transmit(&frame) {
                self.tx_errors += 1;
                tracing::warn!(error = %e, "BMS poll transmit failed");
            }
        }
    }

    fn send_telemetry(&mut self, frame: &vcu_traits::CanFrame) {
        if let Err(e) = self.telemetry_bus.transmit(frame) {
            self.tx_errors += 1;
            tracing::warn!(error = %e, id = frame.id, "telemetry transmit failed");
        }
    }
}

pub struct DriveSession {
    sched: Scheduler<SessionCtx>,
    ctx: SessionCtx,
    tick_ms: u64,
}

impl DriveSession {
    pub fn new(
        cfg: &Config,
        inputs: Box<dyn Inputs + Send>,
        motor_bus: Box<dyn CanBus + Send>,
        telemetry_bus: Box<dyn CanBus + Send>,
        rx: Option<CanRxPump>,
    ) -> Result<Self> {
        cfg.validate()?;
        let tick_ms = cfg.scheduler.tick_ms;

        let throttle_map = curves::map_from_rows(&cfg.throttle_table, curves::default_throttle_map)
            .map_err(crate::error::Report::new)?;
        let brake_map = curves::map_from_rows(&cfg.brake_table, curves::default_brake_map)
            .map_err(crate::error::Report::new)?;
        let pedal = Pedal::with_maps(&cfg.pedal, tick_ms, throttle_map, brake_map)
            .map_err(crate::error::Report::new)?;

        let ctx = SessionCtx {
            pedal,
            car: CarState::new(&cfg.car, tick_ms),
            bms: BmsTracker::new(&cfg.bms, tick_ms),
            rotation: TelemetryRotation::new(&cfg.telemetry),
            inputs,
            motor_bus,
            telemetry_bus,
            rx,
            snapshot: TelemetrySnapshot::default(),
            last_fault: PedalFault::None,
            tx_errors: 0,
            failure: None,
        };

        let mut sched = Scheduler::new(tick_ms, 8).map_err(crate::error::Report::new)?;
        sched
            .register("control", tick_ms, |ctx: &mut SessionCtx, tick| {
                ctx.control(tick);
            })
            .map_err(crate::error::Report::new)?;
        sched
            .register("motor_tx", cfg.scheduler.motor_tx_ms, |ctx, _| {
                ctx.motor_tx();
            })
            .map_err(crate::error::Report::new)?;
        sched
            .register("telemetry", cfg.scheduler.telemetry_ms, |ctx, _| {
                ctx.telemetry_tx();
            })
            .map_err(crate::error::Report::new)?;
        sched
            .register("bms_poll", cfg.scheduler.bms_poll_ms, |ctx, _| {
                ctx.bms_poll();
            })
            .map_err(crate::error::Report::new)?;

        Ok(Self {
            sched,
            ctx,
            tick_ms,
        })
    }

    /// Advance one scheduler tick. Deterministic; the tick number is the
    /// caller's notion of time.
    pub fn step(&mut self, tick: u64) -> Result<()> {
        self.sched.run_tick(tick, &mut self.ctx);
        if let Some(failure) = self.ctx.failure.take() {
            tracing::error!(error = %failure, "drive session aborted");
            return Err(failure);
        }
        Ok(())
    }

    /// Run ticks `0..n`, for tests and scripted sessions.
    pub fn run_for_ticks(&mut self, n: u64) -> Result<()> {
        for tick in 0..n {
            self.step(tick)?;
        }
        Ok(())
    }

    /// Pace steps off `clock` until `shutdown` is raised. A loop that falls
    /// behind skips to the current tick; the scheduler logs the overrun.
    pub fn run<C: Clock>(&mut self, clock: &C, shutdown: &AtomicBool) -> Result<()> {
        let epoch = clock.now();
        let period = std::time::Duration::from_millis(self.tick_ms);
        let mut last_tick = None;
        tracing::info!(tick_ms = self.tick_ms, "drive session start");

        while !shutdown.load(Ordering::Relaxed) {
            let now_tick = clock.ms_since(epoch) / self.tick_ms;
            if last_tick != Some(now_tick) {
                self.step(now_tick)?;
                last_tick = Some(now_tick);
            }
            clock.sleep(period);
        }
        tracing::info!("drive session shut down");
        Ok(())
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.ctx.snapshot
    }

    pub fn overruns(&self) -> u64 {
        self.sched.overruns()
    }

    pub fn tx_errors(&self) -> u64 {
        self.ctx.tx_errors
    }
}

/// Ticks needed to cover `ms` at this session's tick period.
pub fn ticks_for(cfg: &Config, ms: u64) -> u64 {
    util::ticks_for_ms(ms, cfg.scheduler.tick_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpm_from_hall_frequency() {
        // 6 pulses per rev: 100 Hz -> 1000 rpm.
        assert_eq!(motor_rpm(100), 1000);
        assert_eq!(motor_rpm(0), 0);
    }

    #[test]
    fn speed_from_rpm() {
        // 4000 motor rpm -> 1000 wheel rpm -> 1.57 km per minute -> 94 km/h.
        assert_eq!(wheel_speed_kmh(4000), 94);
        assert_eq!(wheel_speed_kmh(0), 0);
    }
}
