//! Catalog of playable actions and technologies.
//!
//! The built-in catalog mirrors the companion web client; deployments can
//! replace it with a JSON file referenced from the application config.

use std::{fs, path::Path};

use anyhow::Context;
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dao::models::{ResourcesEntity, RunningItemEntity};

/// How an item leaves the running set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndMode {
    /// Removed by the simulation once its duration elapses.
    Auto,
    /// Runs until a player stops it.
    Manual,
}

/// A playable city action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub id: String,
    pub name: String,
    /// Zone the action improves.
    pub zone: usize,
    /// Percent satisfaction gained by the zone on completion.
    pub value: f64,
    /// Duration as a multiple of the level's timelapse.
    pub endtime: f64,
    pub endmode: EndMode,
    /// Resource cost held while the action runs.
    pub resources: ResourcesEntity,
    /// Resources produced when the action completes.
    pub newresources: ResourcesEntity,
    /// Files that must be available before starting.
    #[serde(default)]
    pub files: Vec<String>,
    /// Technologies of which at least one must be running before starting.
    #[serde(default)]
    pub technologies: Vec<String>,
}

/// A playable technology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologySpec {
    pub id: String,
    pub name: String,
    /// Duration as a multiple of the level's timelapse.
    pub endtime: f64,
    pub endmode: EndMode,
    /// Capacity cost held while the technology runs.
    pub capacity: f64,
    /// Files produced when the technology completes.
    #[serde(default)]
    pub files: Vec<String>,
    /// Whether the technology samples city health while running.
    #[serde(default)]
    pub measuring: bool,
}

#[derive(Deserialize)]
struct RawCatalog {
    actions: Vec<ActionSpec>,
    technologies: Vec<TechnologySpec>,
}

/// The full set of playable items, keyed by id in display order.
pub struct Catalog {
    actions: IndexMap<String, ActionSpec>,
    technologies: IndexMap<String, TechnologySpec>,
}

impl Catalog {
    /// Load a catalog from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading catalog from {}", path.display()))?;
        let raw: RawCatalog = serde_json::from_str(&contents)
            .with_context(|| format!("parsing catalog from {}", path.display()))?;
        Ok(Self::from_parts(raw.actions, raw.technologies))
    }

    pub(crate) fn from_parts(actions: Vec<ActionSpec>, technologies: Vec<TechnologySpec>) -> Self {
        Self {
            actions: actions
                .into_iter()
                .map(|spec| (spec.id.clone(), spec))
                .collect(),
            technologies: technologies
                .into_iter()
                .map(|spec| (spec.id.clone(), spec))
                .collect(),
        }
    }

    pub fn action(&self, id: &str) -> Option<&ActionSpec> {
        self.actions.get(id)
    }

    pub fn technology(&self, id: &str) -> Option<&TechnologySpec> {
        self.technologies.get(id)
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionSpec> {
        self.actions.values()
    }

    pub fn technologies(&self) -> impl Iterator<Item = &TechnologySpec> {
        self.technologies.values()
    }

    /// Randomly spread the action catalog over `members` assignment slices.
    pub fn assign_actions(&self, members: usize) -> Vec<Vec<String>> {
        distribute(self.actions.keys().cloned().collect(), members)
    }

    /// Randomly spread the technology catalog over `members` assignment slices.
    pub fn assign_technologies(&self, members: usize) -> Vec<Vec<String>> {
        distribute(self.technologies.keys().cloned().collect(), members)
    }

    /// Resource cost currently held by the given running actions.
    pub fn held_resources(&self, running: &[RunningItemEntity]) -> ResourcesEntity {
        let mut held = ResourcesEntity::zero();
        for item in running {
            if let Some(spec) = self.action(&item.id) {
                held.human += spec.resources.human;
                held.physical += spec.resources.physical;
                held.energy += spec.resources.energy;
            }
        }
        held
    }

    /// Capacity currently held by the given running technologies.
    pub fn held_capacity(&self, running: &[RunningItemEntity]) -> f64 {
        running
            .iter()
            .filter_map(|item| self.technology(&item.id))
            .map(|spec| spec.capacity)
            .sum()
    }
}

impl Default for Catalog {
    /// The built-in catalog.
    fn default() -> Self {
        Self::from_parts(builtin_actions(), builtin_technologies())
    }
}

/// Spread `ids` over `slots` slices of near-equal size.
///
/// Placement is random so every new game deals a different hand; a bounded
/// number of random probes per item keeps the routine from spinning on full
/// slices, with a deterministic sweep as the fallback.
fn distribute(ids: Vec<String>, slots: usize) -> Vec<Vec<String>> {
    const MAX_PROBES: usize = 1000;

    let slots = slots.max(1);
    let capacity = ids.len().div_ceil(slots);
    let mut slices: Vec<Vec<String>> = vec![Vec::new(); slots];
    let mut rng = rand::rng();

    for id in ids {
        let mut placed = false;
        for _ in 0..MAX_PROBES {
            let pick = rng.random_range(0..slots);
            if slices[pick].len() < capacity {
                slices[pick].push(id.clone());
                placed = true;
                break;
            }
        }
        if !placed
            && let Some(slice) = slices.iter_mut().find(|slice| slice.len() < capacity)
        {
            slice.push(id);
        }
    }

    slices
}

fn res(human: f64, physical: f64, energy: f64) -> ResourcesEntity {
    ResourcesEntity {
        human,
        physical,
        energy,
    }
}

fn action(
    id: &str,
    name: &str,
    zone: usize,
    value: f64,
    endtime: f64,
    endmode: EndMode,
    resources: ResourcesEntity,
    newresources: ResourcesEntity,
    files: &[&str],
    technologies: &[&str],
) -> ActionSpec {
    ActionSpec {
        id: id.to_owned(),
        name: name.to_owned(),
        zone,
        value,
        endtime,
        endmode,
        resources,
        newresources,
        files: files.iter().map(|f| (*f).to_owned()).collect(),
        technologies: technologies.iter().map(|t| (*t).to_owned()).collect(),
    }
}

fn builtin_actions() -> Vec<ActionSpec> {
    vec![
        action("a1", "Field hospitals", 0, 8.0, 2.0, EndMode::Auto, res(12.0, 10.0, 6.0), res(0.0, 0.0, 0.0), &[], &[]),
        action("a2", "Food distribution", 1, 6.0, 1.0, EndMode::Auto, res(8.0, 12.0, 4.0), res(2.0, 0.0, 0.0), &[], &[]),
        action("a3", "Water treatment", 2, 7.0, 3.0, EndMode::Auto, res(10.0, 14.0, 10.0), res(0.0, 1.0, 0.0), &[], &["t22"]),
        action("a4", "Public transit shifts", 3, 5.0, 1.0, EndMode::Manual, res(6.0, 8.0, 12.0), res(0.0, 0.0, 0.0), &[], &[]),
        action("a5", "Community patrols", 4, 4.0, 2.0, EndMode::Manual, res(10.0, 4.0, 2.0), res(0.0, 0.0, 0.0), &[], &[]),
        action("a6", "Waste collection", 5, 6.0, 1.0, EndMode::Auto, res(8.0, 10.0, 8.0), res(0.0, 0.0, 1.0), &[], &[]),
        action("a7", "Vaccination drive", 0, 12.0, 4.0, EndMode::Auto, res(16.0, 12.0, 8.0), res(0.0, 0.0, 0.0), &["f21"], &["t21"]),
        action("a8", "Urban gardens", 1, 9.0, 5.0, EndMode::Auto, res(10.0, 8.0, 4.0), res(3.0, 0.0, 0.0), &[], &["t23"]),
        action("a9", "Grid maintenance", 2, 8.0, 3.0, EndMode::Auto, res(8.0, 16.0, 14.0), res(0.0, 0.0, 4.0), &["f25"], &[]),
        action("a10", "School reopening", 3, 10.0, 4.0, EndMode::Auto, res(12.0, 10.0, 6.0), res(2.0, 0.0, 0.0), &["f21"], &["t21", "t24"]),
        action("a11", "Emergency broadcast", 4, 6.0, 1.0, EndMode::Auto, res(4.0, 6.0, 10.0), res(0.0, 0.0, 0.0), &[], &["t26"]),
        action("a12", "Recycling plant", 5, 11.0, 6.0, EndMode::Auto, res(14.0, 18.0, 12.0), res(0.0, 4.0, 0.0), &["f25"], &["t22"]),
    ]
}

fn technology(
    id: &str,
    name: &str,
    endtime: f64,
    endmode: EndMode,
    capacity: f64,
    files: &[&str],
    measuring: bool,
) -> TechnologySpec {
    TechnologySpec {
        id: id.to_owned(),
        name: name.to_owned(),
        endtime,
        endmode,
        capacity,
        files: files.iter().map(|f| (*f).to_owned()).collect(),
        measuring,
    }
}

fn builtin_technologies() -> Vec<TechnologySpec> {
    vec![
        technology("t21", "Genome sequencing", 3.0, EndMode::Auto, 20.0, &["f21"], false),
        technology("t22", "Water sensors", 2.0, EndMode::Manual, 12.0, &[], false),
        technology("t23", "Soil analysis", 2.0, EndMode::Auto, 10.0, &["f23"], false),
        technology("t24", "Health monitoring", 1.0, EndMode::Manual, 16.0, &[], true),
        technology("t25", "Power telemetry", 3.0, EndMode::Auto, 14.0, &["f25"], false),
        technology("t26", "Mesh radio", 1.0, EndMode::Manual, 8.0, &[], false),
        technology("t27", "Drone mapping", 4.0, EndMode::Auto, 18.0, &["f27"], false),
        technology("t28", "Open data portal", 2.0, EndMode::Manual, 6.0, &[], false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::city::level::ZONE_COUNT;
    use std::collections::HashSet;

    #[test]
    fn builtin_catalog_is_internally_consistent() {
        let catalog = Catalog::default();

        let produced_files: HashSet<&String> = catalog
            .technologies()
            .flat_map(|tech| tech.files.iter())
            .collect();

        for action in catalog.actions() {
            assert!(action.zone < ZONE_COUNT, "zone out of range for {}", action.id);
            for tech in &action.technologies {
                assert!(
                    catalog.technology(tech).is_some(),
                    "unknown technology {tech} required by {}",
                    action.id
                );
            }
            for file in &action.files {
                assert!(
                    produced_files.contains(file),
                    "file {file} required by {} is never produced",
                    action.id
                );
            }
        }
    }

    #[test]
    fn builtin_catalog_has_a_health_sampler() {
        let catalog = Catalog::default();
        assert!(catalog.technologies().any(|tech| tech.measuring));
    }

    #[test]
    fn distribute_covers_every_item_exactly_once() {
        let ids: Vec<String> = (0..13).map(|i| format!("a{i}")).collect();
        let slices = distribute(ids.clone(), 4);
        assert_eq!(slices.len(), 4);

        let mut seen: Vec<String> = slices.iter().flatten().cloned().collect();
        seen.sort();
        let mut expected = ids;
        expected.sort();
        assert_eq!(seen, expected);

        let cap = 13usize.div_ceil(4);
        assert!(slices.iter().all(|slice| slice.len() <= cap));
    }

    #[test]
    fn distribute_handles_degenerate_slot_counts() {
        let slices = distribute(vec!["x".into()], 0);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0], vec!["x".to_string()]);
    }

    #[test]
    fn held_resources_sum_running_costs() {
        let catalog = Catalog::default();
        let running = vec![
            RunningItemEntity { id: "a1".into(), starttime: 0 },
            RunningItemEntity { id: "a2".into(), starttime: 0 },
        ];
        let held = catalog.held_resources(&running);
        assert_eq!(held.human, 20.0);
        assert_eq!(held.physical, 22.0);
        assert_eq!(held.energy, 10.0);
    }
}
