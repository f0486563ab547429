//! Difficulty levels of the city simulation.

use crate::dao::models::{ResourcesEntity, TechResourcesEntity};

/// Number of city zones tracked by every level.
pub const ZONE_COUNT: usize = 6;

/// Static tuning of one difficulty level.
#[derive(Debug, Clone)]
pub struct Level {
    /// Starting score.
    pub score: f64,
    /// Number of lapses until the scenario is survived.
    pub lapses: u32,
    /// Simulated seconds per lapse.
    pub timelapse: i64,
    /// Baseline zone satisfaction in [0, 1].
    pub zones: [f64; ZONE_COUNT],
    /// Consumption rate applied per lapse.
    pub cr: f64,
    /// Expected number of concurrently running actions.
    pub ea: f64,
    /// Discontent smoothing divisor.
    pub ds: f64,
    /// Action resource pools available to the team.
    pub resources: ResourcesEntity,
    /// Technology capacity pool.
    pub techresources: TechResourcesEntity,
}

const BASE_ZONES: [f64; ZONE_COUNT] = [0.74, 0.9, 0.8, 0.8, 0.9, 0.77];

const fn level(cr: f64, ea: f64) -> Level {
    Level {
        score: 89.0,
        lapses: 48,
        timelapse: 3600,
        zones: BASE_ZONES,
        cr,
        ea,
        ds: 10.0,
        resources: ResourcesEntity {
            human: 100.0,
            physical: 100.0,
            energy: 100.0,
        },
        techresources: TechResourcesEntity { capacity: 100.0 },
    }
}

static LEVELS: [Level; 3] = [level(3.0, 4.0), level(4.0, 6.0), level(5.0, 7.0)];

/// Tuning for a level index; out-of-range indexes clamp to the hardest level.
pub fn for_index(index: u8) -> &'static Level {
    LEVELS.get(index as usize).unwrap_or(&LEVELS[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_get_harder() {
        assert!(for_index(0).cr < for_index(1).cr);
        assert!(for_index(1).cr < for_index(2).cr);
        assert_eq!(for_index(9).cr, for_index(2).cr);
    }
}
