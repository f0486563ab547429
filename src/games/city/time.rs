//! Simulated-time accounting.
//!
//! A running city accrues simulated seconds at `2^(timeframe-1)` real seconds
//! per wall-clock second. Accrual is debounced so bursts of socket traffic do
//! not hammer the store with recalculations.

use crate::dao::models::TimeControlEntity;

/// Normal play speed.
pub const TIMEFRAME_NORMAL: u8 = 1;
/// Accelerated play speed (16x).
pub const TIMEFRAME_FAST: u8 = 5;

/// Minimum wall-clock seconds between accruals.
const MIN_RECALC_SECS: i64 = 5;

/// Simulated seconds accrued per real second at the given timeframe.
///
/// The exponent is clamped so a corrupted stored timeframe cannot overflow
/// the shift.
pub fn rate(timeframe: u8) -> i64 {
    let exponent = u32::from(timeframe.saturating_sub(1)).min(32);
    1 << exponent
}

/// Convert a simulated duration to real seconds at the given timeframe.
pub fn sim_to_real(sim_seconds: i64, timeframe: u8) -> i64 {
    sim_seconds / rate(timeframe)
}

/// Convert a real duration to simulated seconds at the given timeframe.
pub fn real_to_sim(real_seconds: i64, timeframe: u8) -> i64 {
    real_seconds * rate(timeframe)
}

/// Fresh time control for a game starting now.
pub fn start(now: i64) -> TimeControlEntity {
    TimeControlEntity {
        timeframe: TIMEFRAME_NORMAL,
        starttime: now,
        timeelapsed: 0,
        lastmeasured: 0,
        lastcalc: now,
    }
}

/// Accrue simulated time up to `now`. Returns whether anything changed.
///
/// Unless `force` is set, accruals within [`MIN_RECALC_SECS`] of the previous
/// one are skipped.
pub fn refresh(tc: &mut TimeControlEntity, now: i64, force: bool) -> bool {
    let delta = now - tc.lastcalc;
    if delta <= 0 || (!force && delta < MIN_RECALC_SECS) {
        return false;
    }
    tc.timeelapsed += real_to_sim(delta, tc.timeframe);
    tc.lastcalc = now;
    true
}

/// Switch play speed, flushing accrued time at the old rate first.
///
/// Returns false when the timeframe is unchanged.
pub fn change_timeframe(tc: &mut TimeControlEntity, timeframe: u8, now: i64) -> bool {
    if timeframe == tc.timeframe {
        return false;
    }
    refresh(tc, now, true);
    tc.timeframe = timeframe;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_double_per_timeframe_step() {
        assert_eq!(rate(TIMEFRAME_NORMAL), 1);
        assert_eq!(rate(3), 4);
        assert_eq!(rate(TIMEFRAME_FAST), 16);
    }

    #[test]
    fn rate_survives_corrupted_timeframes() {
        assert_eq!(rate(u8::MAX), 1 << 32);
        assert_eq!(rate(0), 1);
    }

    #[test]
    fn refresh_debounces_small_deltas() {
        let mut tc = start(1000);
        assert!(!refresh(&mut tc, 1003, false));
        assert_eq!(tc.timeelapsed, 0);
        assert_eq!(tc.lastcalc, 1000);

        assert!(refresh(&mut tc, 1010, false));
        assert_eq!(tc.timeelapsed, 10);
    }

    #[test]
    fn forced_refresh_ignores_debounce() {
        let mut tc = start(1000);
        assert!(refresh(&mut tc, 1002, true));
        assert_eq!(tc.timeelapsed, 2);
    }

    #[test]
    fn fast_timeframe_accrues_sixteenfold() {
        let mut tc = start(0);
        tc.timeframe = TIMEFRAME_FAST;
        refresh(&mut tc, 10, false);
        assert_eq!(tc.timeelapsed, 160);
    }

    #[test]
    fn change_timeframe_flushes_at_old_rate() {
        let mut tc = start(0);
        assert!(change_timeframe(&mut tc, TIMEFRAME_FAST, 10));
        // Flushed at 1x before switching.
        assert_eq!(tc.timeelapsed, 10);
        assert_eq!(tc.timeframe, TIMEFRAME_FAST);

        assert!(!change_timeframe(&mut tc, TIMEFRAME_FAST, 20));
        assert_eq!(tc.timeelapsed, 10);
    }

    #[test]
    fn conversions_are_inverse_for_multiples() {
        assert_eq!(sim_to_real(160, TIMEFRAME_FAST), 10);
        assert_eq!(real_to_sim(10, TIMEFRAME_FAST), 160);
    }
}
