//! Piecewise-linear calibration tables.
//!
//! Maps raw sensor units to physical units (pedal travel, torque counts)
//! through an ordered set of control points. Inputs outside the table clamp
//! to the first/last output; segment lookup is a linear scan, which is fine
//! for the handful of points a pedal map carries.

use crate::error::ConfigError;

/// One control point of a calibration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TablePoint {
    pub raw: i32,
    pub out: i32,
}

impl TablePoint {
    pub const fn new(raw: i32, out: i32) -> Self {
        Self { raw, out }
    }
}

/// Piecewise-linear interpolator over an ordered control-point table.
#[derive(Debug, Clone)]
pub struct LinearInterp {
    points: Vec<TablePoint>,
}

impl LinearInterp {
    /// Build from control points. A malformed table (fewer than two points,
    /// or raw inputs not strictly increasing) is a fatal configuration error.
    pub fn new(points: Vec<TablePoint>) -> Result<Self, ConfigError> {
        if points.len() < 2 {
            return Err(ConfigError::InvalidTable("needs at least two points"));
        }
        if points.windows(2).any(|w| w[1].raw <= w[0].raw) {
            return Err(ConfigError::InvalidTable(
                "raw inputs must be strictly increasing",
            ));
        }
        Ok(Self { points })
    }

    /// Build from points already known to satisfy the invariants, for the
    /// built-in tables.
    pub(crate) fn from_points_unchecked(points: Vec<TablePoint>) -> Self {
        debug_assert!(points.len() >= 2);
        debug_assert!(points.windows(2).all(|w| w[1].raw > w[0].raw));
        Self { points }
    }

    /// Interpolate `x` against the table. Pure; clamps outside the range.
    pub fn interp(&self, x: i32) -> i32 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if x <= first.raw {
            return first.out;
        }
        if x >= last.raw {
            return last.out;
        }
        for w in self.points.windows(2) {
            let (p0, p1) = (w[0], w[1]);
            if x < p1.raw {
                // 64-bit intermediates keep the cross product from wrapping.
                let dx = i64::from(p1.raw - p0.raw);
                let dy = i64::from(p1.out - p0.out);
                let off = i64::from(x - p0.raw) * dy / dx;
                return p0.out + off as i32;
            }
        }
        last.out
    }

    /// Raw input of the first control point (start of the active range).
    pub fn start(&self) -> i32 {
        self.points[0].raw
    }

    pub fn points(&self) -> &[TablePoint] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LinearInterp {
        LinearInterp::new(vec![
            TablePoint::new(60, 0),
            TablePoint::new(200, 2000),
            TablePoint::new(450, 10000),
            TablePoint::new(700, 25000),
            TablePoint::new(900, 32500),
        ])
        .unwrap()
    }

    #[test]
    fn exact_at_control_points() {
        let t = table();
        for p in t.points() {
            assert_eq!(t.interp(p.raw), p.out);
        }
    }

    #[test]
    fn clamps_outside_range() {
        let t = table();
        assert_eq!(t.interp(0), 0);
        assert_eq!(t.interp(-50), 0);
        assert_eq!(t.interp(1023), 32500);
    }

    #[test]
    fn midpoint_lands_between_points() {
        let t = table();
        assert_eq!(t.interp(130), 1000); // halfway 60..200 -> halfway 0..2000
    }

    #[test]
    fn rejects_short_or_unordered_tables() {
        assert!(LinearInterp::new(vec![TablePoint::new(0, 0)]).is_err());
        assert!(
            LinearInterp::new(vec![
                TablePoint::new(10, 0),
                TablePoint::new(10, 5),
                TablePoint::new(20, 9),
            ])
            .is_err()
        );
        assert!(LinearInterp::new(vec![TablePoint::new(20, 0), TablePoint::new(10, 5)]).is_err());
    }
}
