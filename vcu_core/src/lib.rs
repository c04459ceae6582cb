#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core vehicle control logic (hardware-agnostic).
//!
//! This crate provides the hardware-independent control engine of the
//! traction control unit. All hardware interactions go through the
//! `vcu_traits::CanBus` and `vcu_traits::Inputs` traits.
//!
//! ## Architecture
//!
//! - **Scheduling**: cooperative fixed-tick task table (`scheduler` module)
//! - **Pedals**: redundant-sensor plausibility and torque mapping (`pedal`)
//! - **Car sequencing**: ready-to-drive state machine (`state`)
//! - **Battery link**: BMS handshake and silence watchdog (`bms`)
//! - **Telemetry**: frozen wire codec and broadcast rotation (`telemetry`)
//! - **Plumbing**: ring buffer, integer filters, table interpolation
//!
//! ## Integer Arithmetic
//!
//! Internals operate on raw ADC counts and inverter torque counts using
//! `i32` with 64-bit intermediates for deterministic behavior; there is no
//! floating point on the control path.

pub mod bms;
pub mod curves;
pub mod error;
pub mod filter;
pub mod interp;
pub mod mocks;
pub mod pedal;
pub mod ring;
pub mod runner;
pub mod rx;
pub mod scheduler;
pub mod state;
pub mod telemetry;
pub mod util;

pub use bms::{BmsStatus, BmsTracker};
pub use error::{ConfigError, Result, VcuError};
pub use filter::{AverageFilter, ExponentialFilter, Filter};
pub use interp::{LinearInterp, TablePoint};
pub use pedal::{FaultBits, Pedal, PedalFault, PedalStatus};
pub use ring::RingBuffer;
pub use runner::DriveSession;
pub use rx::CanRxPump;
pub use scheduler::Scheduler;
pub use state::{CarInputs, CarState, CarStatus};
pub use telemetry::{TelemetryRotation, TelemetrySnapshot};
