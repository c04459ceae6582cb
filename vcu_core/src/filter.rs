//! Sample smoothing for the ADC acquisition path.
//!
//! Everything is integer math: the control loop runs on raw ADC counts and
//! the target has no FPU worth spending on a pedal filter. Ratios and window
//! sizes are compile-time constants per instantiation so the memory footprint
//! is static.

use crate::ring::RingBuffer;

/// A smoothing stage over a raw sample stream.
pub trait Filter {
    fn add_sample(&mut self, sample: i32);
    fn filtered(&self) -> i32;
}

/// Single-pole IIR filter with integer ratios.
///
/// `out = (prev * OLD + sample * NEW + (OLD + NEW) / 2) / (OLD + NEW)`
///
/// The added half-divisor rounds to nearest instead of truncating toward
/// zero; without it the output never reaches the input ceiling when
/// `OLD >> NEW`. Output is always between the previous output and the new
/// sample, so the filter cannot overshoot.
#[derive(Debug, Clone, Default)]
pub struct ExponentialFilter<const OLD: i32, const NEW: i32> {
    last_out: i32,
}

impl<const OLD: i32, const NEW: i32> ExponentialFilter<OLD, NEW> {
    pub fn new() -> Self {
        const {
            assert!(OLD >= 0 && NEW > 0, "filter ratios must be positive");
        };
        Self { last_out: 0 }
    }
}

impl<const OLD: i32, const NEW: i32> Filter for ExponentialFilter<OLD, NEW> {
    fn add_sample(&mut self, sample: i32) {
        let old = i64::from(OLD);
        let new = i64::from(NEW);
        let acc = i64::from(self.last_out) * old + i64::from(sample) * new + (old + new) / 2;
        self.last_out = (acc / (old + new)) as i32;
    }

    fn filtered(&self) -> i32 {
        self.last_out
    }
}

/// Moving average over the last `N` samples.
///
/// During warm-up the mean is taken over however many samples are present,
/// not zero-padded, so the output tracks the input from the first sample.
#[derive(Debug, Clone, Default)]
pub struct AverageFilter<const N: usize> {
    buf: RingBuffer<i32, N>,
}

impl<const N: usize> AverageFilter<N> {
    pub fn new() -> Self {
        Self {
            buf: RingBuffer::new(),
        }
    }

    /// Number of samples currently contributing to the mean.
    pub fn fill(&self) -> usize {
        self.buf.len()
    }
}

impl<const N: usize> Filter for AverageFilter<N> {
    fn add_sample(&mut self, sample: i32) {
        self.buf.push(sample);
    }

    fn filtered(&self) -> i32 {
        let n = self.buf.len();
        if n == 0 {
            return 0;
        }
        let sum: i64 = self.buf.iter().map(|&v| i64::from(v)).sum();
        // Round to nearest, ties away from zero.
        let n = n as i64;
        let half = n / 2;
        let q = if sum >= 0 {
            (sum + half) / n
        } else {
            (sum - half) / n
        };
        q as i32
    }
}
