//! Property tests for the pure control-path pieces.

use proptest::prelude::*;
use std::collections::VecDeque;
use vcu_config::{PedalCfg, PedalFilter};
use vcu_core::filter::{AverageFilter, Filter};
use vcu_core::interp::{LinearInterp, TablePoint};
use vcu_core::pedal::{Pedal, PedalFault};
use vcu_core::ring::RingBuffer;

proptest! {
    /// The ring buffer behaves like a VecDeque capped at N with
    /// evict-oldest, for any interleaving of pushes and pops.
    #[test]
    fn ring_matches_bounded_deque_model(ops in proptest::collection::vec(any::<Option<u16>>(), 0..200)) {
        const N: usize = 8;
        let mut rb: RingBuffer<u16, N> = RingBuffer::new();
        let mut model: VecDeque<u16> = VecDeque::new();
        for op in ops {
            match op {
                Some(v) => {
                    rb.push(v);
                    if model.len() == N {
                        model.pop_front();
                    }
                    model.push_back(v);
                }
                None => {
                    prop_assert_eq!(rb.pop(), model.pop_front());
                }
            }
            prop_assert!(rb.len() <= N);
            prop_assert_eq!(rb.len(), model.len());
        }
        prop_assert_eq!(rb.iter().copied().collect::<Vec<_>>(),
                        model.iter().copied().collect::<Vec<_>>());
    }

    /// Interpolation never leaves the output range of the table and is
    /// monotonic for a monotonic table.
    #[test]
    fn interp_stays_in_range_and_monotonic(xs in proptest::collection::vec(-2000i32..4000, 1..50)) {
        let t = LinearInterp::new(vec![
            TablePoint::new(60, 0),
            TablePoint::new(200, 2_000),
            TablePoint::new(450, 10_000),
            TablePoint::new(700, 25_000),
            TablePoint::new(900, 32_500),
        ]).unwrap();
        let mut xs = xs;
        xs.sort_unstable();
        let mut prev = None;
        for x in xs {
            let y = t.interp(x);
            prop_assert!((0..=32_500).contains(&y));
            if let Some(p) = prev {
                prop_assert!(y >= p);
            }
            prev = Some(y);
        }
    }

    /// The moving average is always inside the min/max envelope of the
    /// samples it has seen within its window.
    #[test]
    fn average_filter_bounded_by_window(samples in proptest::collection::vec(0i32..=1023, 1..100)) {
        let mut f: AverageFilter<8> = AverageFilter::new();
        for (i, &s) in samples.iter().enumerate() {
            f.add_sample(s);
            let window = &samples[i.saturating_sub(7)..=i];
            let lo = *window.iter().min().unwrap();
            let hi = *window.iter().max().unwrap();
            let out = f.filtered();
            prop_assert!(out >= lo && out <= hi, "out {} not in [{}, {}]", out, lo, hi);
        }
    }

    /// Matching channels never fault, whatever the pedal does.
    #[test]
    fn matched_channels_never_fault(pcts in proptest::collection::vec(0u32..=100, 1..300)) {
        let cfg = PedalCfg { filter: PedalFilter::None, ..PedalCfg::default() };
        let mut p = Pedal::new(&cfg, 1).unwrap();
        for (tick, pct) in pcts.iter().enumerate() {
            let a = (30 + (950 - 30) * pct / 100) as u16;
            let b = (u32::from(a) * 33 / 50) as u16;
            let s = p.evaluate(a, b, 100, tick as u64 + 1);
            prop_assert_eq!(s.fault, PedalFault::None);
        }
    }

    /// A disagreement shorter than the trip window never latches, wherever
    /// it falls in the session.
    #[test]
    fn short_disagreements_never_latch(start in 1u64..500, len in 1u64..100) {
        let cfg = PedalCfg { filter: PedalFilter::None, ..PedalCfg::default() };
        let mut p = Pedal::new(&cfg, 1).unwrap();
        for tick in 1..(start + len + 50) {
            let (a, b) = if (start..start + len).contains(&tick) {
                (766u16, 141u16) // 80 % vs 20 %
            } else {
                (490, 323) // both 50 %
            };
            p.evaluate(a, b, 100, tick);
            prop_assert!(!p.latched(), "latched at tick {}", tick);
        }
    }
}
