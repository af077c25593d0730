//! Per-row down-sampling decisions for windowed reads.
//!
//! When a client asks for roughly `approx_num_samples` rows up to `to`, the
//! sampler estimates the row cadence from the first two timestamped rows and
//! derives a real-valued stride from it. Fractional strides are realised by
//! re-drawing the integer stride (floor or ceiling) for every row and keeping
//! the row when its index is a multiple of it. Rows within the tail window of
//! `to` are always emitted.

use rand::Rng;

use crate::core::query::WindowQuery;
use crate::core::window::WindowConfig;

/// Request-local sampling state, threaded by value through each row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingState {
    pub prev_timestamp: Option<i64>,
    /// Row cadence fixed from the first usable pair of timestamps.
    pub estimated_period: Option<u64>,
    /// Real-valued stride, always >= 1.0.
    pub stride: f64,
    /// Timestamped rows considered so far; drives the modulo decision.
    pub row_index: u64,
}

impl SamplingState {
    pub fn new() -> Self {
        Self {
            prev_timestamp: None,
            estimated_period: None,
            stride: 1.0,
            row_index: 0,
        }
    }
}

impl Default for SamplingState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StrideSampler {
    to: Option<i64>,
    approx_num_samples: Option<u64>,
    tail_window: Option<u32>,
}

impl StrideSampler {
    pub fn new(query: &WindowQuery, config: &WindowConfig) -> Self {
        Self {
            to: query.to,
            approx_num_samples: query.approx_num_samples,
            tail_window: config.tail_window,
        }
    }

    /// True when this request can down-sample at all.
    pub fn is_active(&self) -> bool {
        self.to.is_some() && self.approx_num_samples.is_some()
    }

    /// Decide whether the row stamped `ts` is emitted.
    pub fn include<R: Rng>(&self, state: SamplingState, ts: i64, rng: &mut R) -> (bool, SamplingState) {
        let mut next = state;

        if next.estimated_period.is_none() {
            if let (Some(prev), Some(to), Some(samples)) =
                (state.prev_timestamp, self.to, self.approx_num_samples)
            {
                let period = ts.abs_diff(prev);
                if period.saturating_mul(samples) > 0 {
                    next.estimated_period = Some(period);
                    let span = to as f64 - prev as f64;
                    next.stride = (span / (period as f64 * samples as f64)).max(1.0);
                }
            }
        }

        if let (Some(period), Some(to), Some(tail)) = (next.estimated_period, self.to, self.tail_window) {
            if to.abs_diff(ts) as f64 / (period as f64) < f64::from(tail) {
                next.stride = 1.0;
            }
        }

        let include = if next.stride <= 1.0 {
            true
        } else {
            let lower = next.stride.floor();
            let upper_probability = next.stride - lower;
            let effective = if rng.gen::<f64>() < upper_probability {
                lower as u64 + 1
            } else {
                lower as u64
            };
            state.row_index % effective == 0
        };

        next.row_index += 1;
        next.prev_timestamp = Some(ts);
        (include, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sampler(to: Option<i64>, samples: Option<u64>, tail: Option<u32>) -> StrideSampler {
        StrideSampler {
            to,
            approx_num_samples: samples,
            tail_window: tail,
        }
    }

    fn run(sampler: &StrideSampler, stamps: impl IntoIterator<Item = i64>) -> (Vec<bool>, SamplingState) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = SamplingState::new();
        let mut decisions = Vec::new();
        for ts in stamps {
            let (keep, next) = sampler.include(state, ts, &mut rng);
            decisions.push(keep);
            state = next;
        }
        (decisions, state)
    }

    #[test]
    fn inactive_sampler_keeps_everything() {
        let s = sampler(Some(10_000), None, Some(6));
        assert!(!s.is_active());
        let (decisions, state) = run(&s, (0..1000).map(|i| i * 10));
        assert!(decisions.iter().all(|&keep| keep));
        assert_eq!(state.estimated_period, None);
        assert_eq!(state.row_index, 1000);
    }

    #[test]
    fn period_and_stride_from_first_pair() {
        let s = sampler(Some(10_000), Some(10), None);
        let (_, state) = run(&s, [0, 100]);
        assert_eq!(state.estimated_period, Some(100));
        assert!((state.stride - 10.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_timestamps_delay_estimation() {
        let s = sampler(Some(10_000), Some(10), None);
        let (_, state) = run(&s, [0, 0, 0]);
        assert_eq!(state.estimated_period, None);
        let (_, state) = run(&s, [0, 0, 50]);
        assert_eq!(state.estimated_period, Some(50));
    }

    #[test]
    fn stride_never_below_one() {
        let s = sampler(Some(500), Some(1_000), None);
        let (decisions, state) = run(&s, (0..5).map(|i| i * 100));
        assert_eq!(state.stride, 1.0);
        assert!(decisions.iter().all(|&keep| keep));
    }

    #[test]
    fn integer_stride_keeps_every_nth_row() {
        let s = sampler(Some(100_000), Some(250), None);
        let (decisions, _) = run(&s, (0..1_000).map(|i| i * 100));
        // stride = 100000 / (100 * 250) = 4
        let kept: Vec<usize> = decisions
            .iter()
            .enumerate()
            .filter(|(_, &keep)| keep)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(kept.len(), 250);
        assert!(kept.iter().all(|&row| row % 4 == 0));
    }

    #[test]
    fn decision_uses_row_index_modulo_stride() {
        // stride = 10_000 / (100 * 40) = 2.5, so each row uses 2 or 3
        let s = sampler(Some(10_000), Some(40), None);
        let (decisions, state) = run(&s, (0..100).map(|i| i * 100));
        assert_eq!(state.row_index, 100);
        for (row, &keep) in decisions.iter().enumerate() {
            if row % 2 == 0 && row % 3 == 0 {
                assert!(keep, "row {row} is a multiple of both strides");
            }
            if row % 2 != 0 && row % 3 != 0 {
                assert!(!keep, "row {row} is a multiple of neither stride");
            }
        }
    }

    #[test]
    fn fractional_stride_matches_rate() {
        // period 1, to 100_000, 40_000 samples -> stride 2.5
        let s = sampler(Some(100_000), Some(40_000), None);
        let (decisions, state) = run(&s, 0..100_000);
        assert!((state.stride - 2.5).abs() < 1e-9);
        let kept = decisions.iter().filter(|&&keep| keep).count() as f64;
        let fraction = kept / decisions.len() as f64;
        let expected = 1.0 / 2.5;
        assert!(
            (fraction - expected).abs() < expected * 0.05,
            "fraction {fraction} too far from {expected}"
        );
    }

    #[test]
    fn tail_window_is_full_resolution() {
        let stamps: Vec<i64> = (0..1_000).map(|i| i * 100).collect();
        let to = *stamps.last().unwrap();
        let s = sampler(Some(to), Some(20), Some(6));
        let (decisions, state) = run(&s, stamps.iter().copied());
        assert!(decisions[decisions.len() - 6..].iter().all(|&keep| keep));
        assert_eq!(state.stride, 1.0);
        let kept = decisions.iter().filter(|&&keep| keep).count();
        assert!(kept < 100, "kept {kept} rows");
    }

    #[test]
    fn no_tail_window_keeps_sampling_to_the_end() {
        let stamps: Vec<i64> = (0..1_000).map(|i| i * 100).collect();
        let to = *stamps.last().unwrap();
        let s = sampler(Some(to), Some(20), None);
        let (decisions, _) = run(&s, stamps.iter().copied());
        assert!(decisions[decisions.len() - 6..].iter().any(|&keep| !keep));
    }
}
