//! Pure scoring math of the city simulation.
//!
//! All functions here are side-effect free so the lapse processing in the
//! engine and the lifetime projection share one set of formulas.

use super::level::Level;

/// Default per-zone discontent applied before the first measured reducer exists.
const DEFAULT_DISCONTENT: f64 = 0.1;

/// Round to two decimals, the precision persisted for zone values.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Consumption factor of one lapse.
///
/// Each zone contributes its dissatisfaction `1 - Bx`, where `Bx` is the
/// clamped level baseline plus accrued profit, discounted by the reducer.
/// The factor always reads the static baseline, not the drifted zone values.
pub fn consumption_factor(
    baseline: &[f64],
    profit: &[f64],
    reducer: Option<f64>,
    cr: f64,
) -> f64 {
    let discontent = reducer.unwrap_or(DEFAULT_DISCONTENT);
    let sum: f64 = baseline
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let gain = profit.get(index).copied().unwrap_or(0.0);
            let bx = (value + gain).clamp(0.0, 1.0) - discontent;
            1.0 - bx
        })
        .sum();
    sum * cr / baseline.len() as f64
}

/// Score after one lapse: the previous score decays by the consumption factor
/// and recovers by the resources produced during the lapse.
pub fn next_score(score: f64, lapses: u32, fc: f64, produced: f64) -> f64 {
    let decay = 100.0 / lapses as f64;
    score - decay * fc + produced
}

/// Reducer after one lapse. Idle teams accumulate discontent faster.
pub fn next_reducer(reducer: Option<f64>, running_actions: usize, ea: f64, ds: f64) -> f64 {
    let idle = (1.0 - running_actions as f64 / ea).max(0.0);
    reducer.unwrap_or(0.0) + idle / ds
}

/// Advance zone satisfactions by the lapse profit minus the reducer increment.
pub fn next_zone_values(
    zone_values: &[f64],
    profit: &[f64],
    reducer: Option<f64>,
    new_reducer: f64,
) -> Vec<f64> {
    let increment = new_reducer - reducer.unwrap_or(0.0);
    zone_values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let gain = profit.get(index).copied().unwrap_or(0.0);
            round2((value + gain - increment).clamp(0.0, 1.0))
        })
        .collect()
}

/// Project how many simulated seconds remain until the score hits zero.
///
/// Profit and the running-action count are held constant; only the reducer
/// and score evolve. The projection is capped at twice the scenario length so
/// a healthy city reports a finite lifetime.
pub fn estimate_end_seconds(
    level: &Level,
    score: f64,
    profit: &[f64],
    reducer: Option<f64>,
    running_actions: usize,
) -> i64 {
    let decay = 100.0 / level.lapses as f64;
    let cap = level.lapses * 2;

    let mut remaining_score = score;
    let mut discontent = reducer;
    let mut end: u32 = 0;

    while remaining_score > 0.0 && end < cap {
        let fc = consumption_factor(&level.zones, profit, discontent, level.cr);
        remaining_score -= decay * fc;
        discontent = Some(next_reducer(
            discontent,
            running_actions,
            level.ea,
            level.ds,
        ));
        end += 1;
    }

    end as i64 * level.timelapse
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::city::level;

    const BASELINE: [f64; 6] = [0.74, 0.9, 0.8, 0.8, 0.9, 0.77];
    const NO_PROFIT: [f64; 6] = [0.0; 6];

    #[test]
    fn score_decays_without_activity() {
        let lvl = level::for_index(0);
        let fc = consumption_factor(&BASELINE, &NO_PROFIT, None, lvl.cr);
        assert!(fc > 0.0);
        let score = next_score(lvl.score, lvl.lapses, fc, 0.0);
        assert!(score < lvl.score);
    }

    #[test]
    fn idle_consumption_factor_matches_the_level_tuning() {
        // Level 0 baseline sums to 4.91 over six zones, so with the default
        // 0.1 discontent the factor is (6.6 - 4.91) * 3 / 6.
        let lvl = level::for_index(0);
        let fc = consumption_factor(&lvl.zones, &NO_PROFIT, None, lvl.cr);
        assert!((fc - 0.845).abs() < 1e-12);
    }

    #[test]
    fn profit_softens_the_consumption_factor() {
        let lvl = level::for_index(0);
        let idle = consumption_factor(&BASELINE, &NO_PROFIT, None, lvl.cr);
        let profit = [0.1; 6];
        let busy = consumption_factor(&BASELINE, &profit, None, lvl.cr);
        assert!(busy < idle);
    }

    #[test]
    fn reducer_grows_faster_when_idle() {
        let lvl = level::for_index(0);
        let idle = next_reducer(Some(0.2), 0, lvl.ea, lvl.ds);
        let busy = next_reducer(Some(0.2), 4, lvl.ea, lvl.ds);
        assert!(idle > busy);
        // Enough running actions fully absorb the increment.
        assert_eq!(busy, 0.2);
    }

    #[test]
    fn zone_values_stay_within_bounds() {
        let values = next_zone_values(&[0.01, 0.99], &[0.0, 0.5], None, 0.1);
        assert_eq!(values, vec![0.0, 1.0]);
    }

    #[test]
    fn zone_values_round_to_two_decimals() {
        let values = next_zone_values(&[0.5], &[0.123], Some(0.0), 0.0);
        assert_eq!(values, vec![0.62]);
    }

    #[test]
    fn estimate_is_capped_for_thriving_cities() {
        let lvl = level::for_index(0);
        let profit = [0.5; 6];
        let seconds = estimate_end_seconds(lvl, lvl.score, &profit, Some(0.0), 4);
        assert_eq!(seconds, (lvl.lapses * 2) as i64 * lvl.timelapse);
    }

    #[test]
    fn estimate_shrinks_as_score_drops() {
        let lvl = level::for_index(0);
        let healthy = estimate_end_seconds(lvl, 89.0, &NO_PROFIT, None, 0);
        let sick = estimate_end_seconds(lvl, 10.0, &NO_PROFIT, None, 0);
        assert!(sick < healthy);
        assert!(sick > 0);
    }
}
