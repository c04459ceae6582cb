//! Time and period helpers shared by the scheduler and rx pump.

const MICROS_PER_SEC: u64 = 1_000_000;

/// Period in microseconds for a poll rate in Hz. Clamps `hz` to at least 1
/// and never returns 0.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Convert a duration in milliseconds to scheduler ticks, rounding up so a
/// window is never shorter than configured. Tick period is clamped to 1 ms.
#[inline]
pub fn ticks_for_ms(ms: u64, tick_ms: u64) -> u64 {
    ms.div_ceil(tick_ms.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_us_clamps() {
        assert_eq!(period_us(0), MICROS_PER_SEC);
        assert_eq!(period_us(1000), 1000);
    }

    #[test]
    fn ticks_round_up() {
        assert_eq!(ticks_for_ms(100, 1), 100);
        assert_eq!(ticks_for_ms(100, 3), 34);
        assert_eq!(ticks_for_ms(0, 1), 1);
        assert_eq!(ticks_for_ms(5, 0), 5);
    }
}
