//! City management simulation.
//!
//! A group runs a city through a fixed number of lapses. Players start actions
//! and technologies from a catalog dealt across the roster; the simulation
//! consumes the city's score every lapse, softened by the profit of completed
//! actions. The score reaching zero fails the game before the scenario ends.

pub mod catalog;
pub mod level;
pub mod sim;
pub mod time;

use std::sync::Arc;

use serde::Serialize;

use crate::{
    dao::{
        broker_store::BrokerStore,
        models::{
            AvailableFileEntity, CitySummaryEntity, GameSlotEntity, LapseEntity, MemberEntity,
            ResourcesEntity, RunningItemEntity, RunningStateEntity, SlotState, SummaryState,
            ZoneValueEntity,
        },
    },
    error::{DomainError, ServiceError},
};

use catalog::{Catalog, EndMode};
use level::{Level, ZONE_COUNT};

/// Game slots available to each group.
pub const MAX_GAMES: u32 = 2;

/// City health snapshot returned by `gethealth` and pushed by the sampler.
#[derive(Debug, Clone, Serialize)]
pub struct HealthView {
    /// Overall severity in [0, 100]; higher is worse.
    pub general: i64,
    /// Per-zone severity from the last measured lapse.
    pub details: Vec<ZoneHealthView>,
    /// Lapse index the details were measured at.
    pub lastmeasured: u32,
    /// Projected real seconds until the city collapses.
    pub lifetime: i64,
}

/// Severity of one zone.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneHealthView {
    pub zone: usize,
    pub value: i64,
}

/// Result of ending a game, voluntarily or by the simulation.
#[derive(Debug, Clone, Serialize)]
pub struct GameoverView {
    pub result: SlotState,
    pub endlapse: u32,
}

/// Per-user action board inside the `gamestate` payload.
#[derive(Debug, Clone, Serialize)]
pub struct ActionBoardView {
    /// Catalog ids dealt to the requesting user.
    pub available: Vec<String>,
    pub running: Vec<RunningItemEntity>,
    /// Pools left after the held costs of running actions.
    pub resources: ResourcesEntity,
}

/// Per-user technology board inside the `gamestate` payload.
#[derive(Debug, Clone, Serialize)]
pub struct TechnologyBoardView {
    /// Catalog ids dealt to the requesting user.
    pub available: Vec<String>,
    pub running: Vec<RunningItemEntity>,
    /// Capacity left after the held costs of running technologies.
    pub capacity: f64,
}

/// Snapshot returned to clients on `gamestate`, projected for one member.
#[derive(Debug, Clone, Serialize)]
pub struct CityStateView {
    pub state: SummaryState,
    pub games: Vec<GameSlotEntity>,
    pub timeframe: u8,
    pub starttime: i64,
    pub timeelapsed: i64,
    /// Simulated seconds per lapse, 0 while no game runs.
    pub timelapse: i64,
    /// Scenario length in lapses, 0 while no game runs.
    pub lapses: u32,
    pub currentlapse: u32,
    /// Wall-clock instant the scenario would end at the current speed.
    pub duedate: i64,
    pub health: Option<HealthView>,
    pub actions: ActionBoardView,
    pub technologies: TechnologyBoardView,
    pub files: Vec<AvailableFileEntity>,
}

/// Something that happened while the simulation advanced, to be fanned out to
/// the group.
#[derive(Debug, Clone)]
pub enum CronEvent {
    ActionCompleted {
        id: String,
        name: String,
        newresources: ResourcesEntity,
    },
    TechnologyCompleted {
        id: String,
        name: String,
        files: Vec<AvailableFileEntity>,
    },
    HealthUpdate(HealthView),
    LapseChanged {
        score: i64,
        lapse: u32,
        lifetime: i64,
    },
    AutoGameover {
        result: SlotState,
        endlapse: u32,
    },
}

/// City-game engine bound to one group summary.
pub struct CityGame {
    store: Arc<dyn BrokerStore>,
    catalog: Arc<Catalog>,
    members: Vec<MemberEntity>,
    summary: CitySummaryEntity,
}

impl CityGame {
    /// Load the summary for a group, creating and persisting a fresh one on
    /// first access.
    pub async fn load(
        store: Arc<dyn BrokerStore>,
        catalog: Arc<Catalog>,
        groupid: i64,
        members: &[MemberEntity],
        now: i64,
    ) -> Result<Self, ServiceError> {
        let summary = match store.find_city_summary(groupid).await? {
            Some(summary) => summary,
            None => {
                let summary = Self::initial_summary(groupid, now);
                store.save_city_summary(summary.clone()).await?;
                summary
            }
        };
        Ok(Self {
            store,
            catalog,
            members: members.to_vec(),
            summary,
        })
    }

    fn initial_summary(groupid: i64, now: i64) -> CitySummaryEntity {
        let games = (0..MAX_GAMES)
            .map(|id| GameSlotEntity {
                id,
                state: SlotState::Locked,
                score: 0.0,
                level: 0,
                starttime: 0,
                actions: Vec::new(),
                technologies: Vec::new(),
            })
            .collect();

        CitySummaryEntity {
            groupid,
            state: SummaryState::Active,
            games,
            timecontrol: time::start(now),
        }
    }

    /// The persisted summary.
    pub fn summary(&self) -> &CitySummaryEntity {
        &self.summary
    }

    fn active_index(&self) -> Option<usize> {
        self.summary
            .games
            .iter()
            .position(|slot| slot.state == SlotState::Active)
    }

    fn active_required(&self) -> Result<usize, ServiceError> {
        self.active_index()
            .ok_or_else(|| ServiceError::NotFound("no active game".to_owned()))
    }

    fn level(&self, slot: usize) -> &'static Level {
        level::for_index(self.summary.games[slot].level)
    }

    fn member_index(&self, userid: i64) -> Result<usize, ServiceError> {
        self.members
            .iter()
            .position(|member| member.id == userid)
            .ok_or_else(|| DomainError::UserNotInGroup.into())
    }

    async fn running(&self, slot: usize) -> Result<RunningStateEntity, ServiceError> {
        let game = self.summary.games[slot].id;
        Ok(self
            .store
            .find_running(self.summary.groupid, game)
            .await?
            .unwrap_or_else(|| RunningStateEntity::empty(self.summary.groupid, game)))
    }

    async fn latest_lapse(&self, slot: usize) -> Result<Option<LapseEntity>, ServiceError> {
        let game = self.summary.games[slot].id;
        let mut lapses = self.store.find_lapses(self.summary.groupid, game).await?;
        Ok(if lapses.is_empty() {
            None
        } else {
            Some(lapses.remove(0))
        })
    }

    /// Activate the next game slot at the given level.
    pub async fn start(&mut self, lvl: u8, now: i64) -> Result<GameSlotEntity, ServiceError> {
        if self.active_index().is_some() {
            return Err(DomainError::GameAlreadyStarted.into());
        }
        let index = self
            .summary
            .games
            .iter()
            .position(|slot| slot.state == SlotState::Locked)
            .ok_or(DomainError::GameAlreadyStarted)?;

        let tuning = level::for_index(lvl);
        let slots = self.members.len().max(1);
        {
            let slot = &mut self.summary.games[index];
            slot.state = SlotState::Active;
            slot.level = lvl;
            slot.score = tuning.score;
            slot.starttime = now;
            slot.actions = self.catalog.assign_actions(slots);
            slot.technologies = self.catalog.assign_technologies(slots);
        }
        self.summary.state = SummaryState::Active;
        self.summary.timecontrol = time::start(now);

        let game = self.summary.games[index].id;
        self.store
            .save_running(RunningStateEntity::empty(self.summary.groupid, game))
            .await?;
        self.store
            .insert_lapse(LapseEntity {
                groupid: self.summary.groupid,
                game,
                lapse: 0,
                score: tuning.score,
                zones: baseline_zones(tuning),
                reducer: None,
                newresources: ResourcesEntity::zero(),
                timemodify: now,
            })
            .await?;
        self.store.save_city_summary(self.summary.clone()).await?;

        Ok(self.summary.games[index].clone())
    }

    /// Start a catalog action for a user.
    pub async fn play_action(
        &mut self,
        userid: i64,
        id: &str,
        now: i64,
    ) -> Result<RunningItemEntity, ServiceError> {
        let slot = self.active_required()?;
        let spec = self
            .catalog
            .action(id)
            .ok_or(DomainError::InvalidGameItem)?
            .clone();

        let member = self.member_index(userid)?;
        let assigned = self.summary.games[slot]
            .actions
            .get(member)
            .is_some_and(|ids| ids.iter().any(|a| a == id));
        if !assigned {
            return Err(DomainError::NotAssignedItem.into());
        }

        let elapsed = self.refresh_time(now).await?;
        let mut running = self.running(slot).await?;

        if running.actions.iter().any(|item| item.id == id) {
            return Err(DomainError::AlreadyRunning.into());
        }
        if !spec
            .files
            .iter()
            .all(|file| running.availablefiles.iter().any(|f| &f.id == file))
        {
            return Err(DomainError::NotRequiredFiles.into());
        }
        if !spec.technologies.is_empty()
            && !spec
                .technologies
                .iter()
                .any(|tech| running.technologies.iter().any(|item| &item.id == tech))
        {
            return Err(DomainError::NotRequiredTechnologies.into());
        }

        let tuning = self.level(slot);
        let held = self.catalog.held_resources(&running.actions);
        if held.human + spec.resources.human > tuning.resources.human
            || held.physical + spec.resources.physical > tuning.resources.physical
            || held.energy + spec.resources.energy > tuning.resources.energy
        {
            return Err(DomainError::NotResources.into());
        }

        let item = RunningItemEntity {
            id: id.to_owned(),
            starttime: elapsed,
        };
        running.actions.push(item.clone());
        self.store.save_running(running).await?;
        Ok(item)
    }

    /// Stop a running action.
    pub async fn stop_action(&mut self, id: &str, now: i64) -> Result<(), ServiceError> {
        let slot = self.active_required()?;
        self.refresh_time(now).await?;
        let mut running = self.running(slot).await?;

        let position = running
            .actions
            .iter()
            .position(|item| item.id == id)
            .ok_or(DomainError::NotRunningAction)?;
        running.actions.remove(position);
        self.store.save_running(running).await?;
        Ok(())
    }

    /// Start a catalog technology for a user.
    pub async fn play_technology(
        &mut self,
        userid: i64,
        id: &str,
        now: i64,
    ) -> Result<RunningItemEntity, ServiceError> {
        let slot = self.active_required()?;
        let spec = self
            .catalog
            .technology(id)
            .ok_or(DomainError::InvalidGameItem)?
            .clone();

        let member = self.member_index(userid)?;
        let assigned = self.summary.games[slot]
            .technologies
            .get(member)
            .is_some_and(|ids| ids.iter().any(|t| t == id));
        if !assigned {
            return Err(DomainError::NotAssignedItem.into());
        }

        let elapsed = self.refresh_time(now).await?;
        let mut running = self.running(slot).await?;

        if running.technologies.iter().any(|item| item.id == id) {
            return Err(DomainError::AlreadyRunning.into());
        }

        let tuning = self.level(slot);
        let held = self.catalog.held_capacity(&running.technologies);
        if held + spec.capacity > tuning.techresources.capacity {
            return Err(DomainError::NotResources.into());
        }

        let item = RunningItemEntity {
            id: id.to_owned(),
            starttime: elapsed,
        };
        running.technologies.push(item.clone());
        self.store.save_running(running).await?;
        Ok(item)
    }

    /// Stop a running technology, refusing while a running action depends on it.
    pub async fn stop_technology(&mut self, id: &str, now: i64) -> Result<(), ServiceError> {
        let slot = self.active_required()?;
        self.refresh_time(now).await?;
        let mut running = self.running(slot).await?;

        let position = running
            .technologies
            .iter()
            .position(|item| item.id == id)
            .ok_or(DomainError::NotRunningTech)?;

        for action in &running.actions {
            let Some(spec) = self.catalog.action(&action.id) else {
                continue;
            };
            if !spec.technologies.iter().any(|t| t == id) {
                continue;
            }
            // Another running technology from the action's list keeps it valid.
            let covered = spec.technologies.iter().any(|tech| {
                tech != id && running.technologies.iter().any(|item| &item.id == tech)
            });
            if !covered {
                return Err(DomainError::TechRunningRequired.into());
            }
        }

        running.technologies.remove(position);
        self.store.save_running(running).await?;
        Ok(())
    }

    /// Switch the play speed, flushing accrued time at the old rate.
    ///
    /// Unsupported values are a no-op, like repeating the current timeframe.
    pub async fn change_timeframe(&mut self, timeframe: u8, now: i64) -> Result<bool, ServiceError> {
        self.active_required()?;
        if timeframe != time::TIMEFRAME_NORMAL && timeframe != time::TIMEFRAME_FAST {
            return Ok(false);
        }
        let changed = time::change_timeframe(&mut self.summary.timecontrol, timeframe, now);
        if changed {
            self.store.save_city_summary(self.summary.clone()).await?;
        }
        Ok(changed)
    }

    /// Accrue simulated time, persisting the summary when anything changed.
    /// Returns the current simulated seconds.
    async fn refresh_time(&mut self, now: i64) -> Result<i64, ServiceError> {
        if time::refresh(&mut self.summary.timecontrol, now, false) {
            self.store.save_city_summary(self.summary.clone()).await?;
        }
        Ok(self.summary.timecontrol.timeelapsed)
    }

    /// Per-lapse zone profit a set of running actions would yield.
    fn profit_of(&self, running: &[RunningItemEntity]) -> [f64; ZONE_COUNT] {
        let mut profit = [0.0; ZONE_COUNT];
        for item in running {
            if let Some(spec) = self.catalog.action(&item.id)
                && spec.zone < ZONE_COUNT
            {
                profit[spec.zone] += spec.value / 100.0;
            }
        }
        profit
    }

    fn health_from(
        &self,
        slot: usize,
        current: &LapseEntity,
        measured: &LapseEntity,
        running: &RunningStateEntity,
    ) -> HealthView {
        let tuning = self.level(slot);
        let tc = &self.summary.timecontrol;

        let details = measured
            .zones
            .iter()
            .map(|zone| ZoneHealthView {
                zone: zone.zone,
                value: 100 - (zone.value * 100.0).round() as i64,
            })
            .collect();

        let profit = self.profit_of(&running.actions);
        let estimate = sim::estimate_end_seconds(
            tuning,
            current.score,
            &profit,
            current.reducer,
            running.actions.len(),
        );
        let remaining = estimate - tc.timeelapsed % tuning.timelapse;

        HealthView {
            general: (100.0 - current.score).round() as i64,
            details,
            lastmeasured: tc.lastmeasured,
            lifetime: time::sim_to_real(remaining.max(0), tc.timeframe),
        }
    }

    /// Current health report for the active game.
    pub async fn health(&mut self, now: i64) -> Result<HealthView, ServiceError> {
        let slot = self.active_required()?;
        self.refresh_time(now).await?;

        let current = self
            .latest_lapse(slot)
            .await?
            .ok_or_else(|| ServiceError::Internal("game has no lapse record".to_owned()))?;
        let game = self.summary.games[slot].id;
        let lapses = self.store.find_lapses(self.summary.groupid, game).await?;
        let measured = lapses
            .iter()
            .find(|lapse| lapse.lapse == self.summary.timecontrol.lastmeasured)
            .unwrap_or(&current);
        let running = self.running(slot).await?;

        Ok(self.health_from(slot, &current, measured, &running))
    }

    /// End the active game voluntarily. The verdict projects the city's
    /// remaining lifetime: collapsing before the scenario length fails.
    pub async fn gameover(&mut self, now: i64) -> Result<GameoverView, ServiceError> {
        let slot = self.active_required()?;
        time::refresh(&mut self.summary.timecontrol, now, true);

        let current = self
            .latest_lapse(slot)
            .await?
            .ok_or_else(|| ServiceError::Internal("game has no lapse record".to_owned()))?;
        let running = self.running(slot).await?;
        let tuning = self.level(slot);

        let profit = self.profit_of(&running.actions);
        let lifetime = sim::estimate_end_seconds(
            tuning,
            current.score,
            &profit,
            current.reducer,
            running.actions.len(),
        );

        let end = self.summary.timecontrol.timeelapsed + lifetime;
        let goodend = tuning.timelapse * tuning.lapses as i64;
        let result = if end < goodend {
            SlotState::Failed
        } else {
            SlotState::Passed
        };
        let endlapse = (end / tuning.timelapse) as u32;

        self.summary.games[slot].state = result;
        self.close_summary_if_done();
        self.store.save_city_summary(self.summary.clone()).await?;

        Ok(GameoverView { result, endlapse })
    }

    fn close_summary_if_done(&mut self) {
        let open = self
            .summary
            .games
            .iter()
            .any(|slot| !slot.state.is_terminal());
        if !open {
            self.summary.state = SummaryState::Ended;
        }
    }

    /// Snapshot for the `gamestate` payload, projected for `userid`.
    pub async fn state(&mut self, userid: i64, now: i64) -> Result<CityStateView, ServiceError> {
        self.refresh_time(now).await?;
        let tc = self.summary.timecontrol.clone();

        let mut view = CityStateView {
            state: self.summary.state,
            games: self.summary.games.clone(),
            timeframe: tc.timeframe,
            starttime: tc.starttime,
            timeelapsed: tc.timeelapsed,
            timelapse: 0,
            lapses: 0,
            currentlapse: 0,
            duedate: 0,
            health: None,
            actions: ActionBoardView {
                available: Vec::new(),
                running: Vec::new(),
                resources: ResourcesEntity::zero(),
            },
            technologies: TechnologyBoardView {
                available: Vec::new(),
                running: Vec::new(),
                capacity: 0.0,
            },
            files: Vec::new(),
        };

        let Some(slot) = self.active_index() else {
            return Ok(view);
        };
        let member = self.member_index(userid)?;
        let tuning = self.level(slot);
        let game = self.summary.games[slot].id;

        let running = self.running(slot).await?;
        let lapses = self.store.find_lapses(self.summary.groupid, game).await?;
        let current = lapses.first();
        let measured = lapses
            .iter()
            .find(|lapse| lapse.lapse == tc.lastmeasured)
            .or(current);

        view.timelapse = tuning.timelapse;
        view.lapses = tuning.lapses;
        view.currentlapse = current.map(|lapse| lapse.lapse).unwrap_or(0);
        let due_sim = tuning.lapses as i64 * tuning.timelapse - tc.timeelapsed;
        view.duedate = now + time::sim_to_real(due_sim.max(0), tc.timeframe);
        if let (Some(current), Some(measured)) = (current, measured) {
            view.health = Some(self.health_from(slot, current, measured, &running));
        }

        let held = self.catalog.held_resources(&running.actions);
        view.actions = ActionBoardView {
            available: self.summary.games[slot]
                .actions
                .get(member)
                .cloned()
                .unwrap_or_default(),
            running: running.actions.clone(),
            resources: ResourcesEntity {
                human: tuning.resources.human - held.human,
                physical: tuning.resources.physical - held.physical,
                energy: tuning.resources.energy - held.energy,
            },
        };
        view.technologies = TechnologyBoardView {
            available: self.summary.games[slot]
                .technologies
                .get(member)
                .cloned()
                .unwrap_or_default(),
            running: running.technologies.clone(),
            capacity: tuning.techresources.capacity
                - self.catalog.held_capacity(&running.technologies),
        };
        view.files = running.availablefiles;

        Ok(view)
    }

    /// Advance the simulation to `now`, processing every lapse boundary that
    /// elapsed since the last sweep. Returns the events to fan out.
    pub async fn advance(&mut self, now: i64) -> Result<Vec<CronEvent>, ServiceError> {
        let Some(slot) = self.active_index() else {
            return Ok(Vec::new());
        };
        time::refresh(&mut self.summary.timecontrol, now, false);

        let tuning = self.level(slot);
        let game = self.summary.games[slot].id;
        let elapsed = self.summary.timecontrol.timeelapsed;
        let target = ((elapsed / tuning.timelapse) as u32).min(tuning.lapses);

        let Some(mut last) = self.latest_lapse(slot).await? else {
            return Ok(Vec::new());
        };
        let mut running = self.running(slot).await?;
        let mut events = Vec::new();

        while last.lapse < target {
            let lapse_index = last.lapse + 1;
            let boundary = lapse_index as i64 * tuning.timelapse;

            let mut profit = [0.0; ZONE_COUNT];
            let mut produced = ResourcesEntity::zero();

            // The discontent counts everything running when the lapse opens,
            // auto completions of this very lapse included.
            let action_count = running.actions.len();

            // Actions past their scheduled end yield their profit this lapse.
            // Auto ones leave the running set; manual ones keep yielding until
            // a player stops them.
            let mut kept = Vec::with_capacity(running.actions.len());
            for item in running.actions.drain(..) {
                let Some(spec) = self.catalog.action(&item.id) else {
                    continue;
                };
                let ends = item.starttime + (spec.endtime * tuning.timelapse as f64) as i64;
                let expired = ends <= boundary;
                if expired {
                    if spec.zone < ZONE_COUNT {
                        profit[spec.zone] += spec.value / 100.0;
                    }
                    produced.human += spec.newresources.human;
                    produced.physical += spec.newresources.physical;
                    produced.energy += spec.newresources.energy;
                }
                if expired && spec.endmode == EndMode::Auto {
                    events.push(CronEvent::ActionCompleted {
                        id: spec.id.clone(),
                        name: spec.name.clone(),
                        newresources: spec.newresources,
                    });
                } else {
                    kept.push(item);
                }
            }
            running.actions = kept;

            // Technologies past their end leave their files; the health
            // sampler stamps a measurement each lapse it is past its end.
            let mut kept = Vec::with_capacity(running.technologies.len());
            let mut sampled = false;
            for item in running.technologies.drain(..) {
                let Some(spec) = self.catalog.technology(&item.id) else {
                    continue;
                };
                let ends = item.starttime + (spec.endtime * tuning.timelapse as f64) as i64;
                let expired = ends <= boundary;
                if !expired {
                    kept.push(item);
                    continue;
                }
                if spec.measuring {
                    sampled = true;
                }
                let files: Vec<AvailableFileEntity> = spec
                    .files
                    .iter()
                    .filter(|file| !running.availablefiles.iter().any(|f| f.id == **file))
                    .map(|file| AvailableFileEntity {
                        id: file.clone(),
                        creationtime: boundary,
                    })
                    .collect();
                running.availablefiles.extend(files.clone());
                if spec.endmode == EndMode::Auto {
                    events.push(CronEvent::TechnologyCompleted {
                        id: spec.id.clone(),
                        name: spec.name.clone(),
                        files,
                    });
                } else {
                    kept.push(item);
                }
            }
            running.technologies = kept;

            let fc = sim::consumption_factor(&tuning.zones, &profit, last.reducer, tuning.cr);
            let gain = produced.human + produced.physical + produced.energy;
            let score = sim::next_score(last.score, tuning.lapses, fc, gain);
            let reducer = sim::next_reducer(last.reducer, action_count, tuning.ea, tuning.ds);
            let values = zone_values(&last.zones);
            let zones = sim::next_zone_values(&values, &profit, last.reducer, reducer)
                .into_iter()
                .enumerate()
                .map(|(zone, value)| ZoneValueEntity { zone, value })
                .collect();

            let lapse = LapseEntity {
                groupid: self.summary.groupid,
                game,
                lapse: lapse_index,
                score,
                zones,
                reducer: Some(reducer),
                newresources: produced,
                timemodify: now,
            };
            self.store.insert_lapse(lapse.clone()).await?;
            self.summary.games[slot].score = score;

            if sampled {
                self.summary.timecontrol.lastmeasured = lapse_index;
                events.push(CronEvent::HealthUpdate(self.health_from(
                    slot, &lapse, &lapse, &running,
                )));
            }

            let projected = self.health_from(slot, &lapse, &lapse, &running);
            events.push(CronEvent::LapseChanged {
                score: score.round() as i64,
                lapse: lapse_index,
                lifetime: projected.lifetime,
            });

            if score <= 0.0 {
                self.summary.games[slot].state = SlotState::Failed;
                events.push(CronEvent::AutoGameover {
                    result: SlotState::Failed,
                    endlapse: lapse_index,
                });
                break;
            }
            if lapse_index == tuning.lapses {
                self.summary.games[slot].state = SlotState::Passed;
                events.push(CronEvent::AutoGameover {
                    result: SlotState::Passed,
                    endlapse: lapse_index,
                });
                break;
            }

            last = lapse;
        }

        self.store.save_running(running).await?;
        if self.summary.games[slot].state.is_terminal() {
            self.close_summary_if_done();
        }
        self.store.save_city_summary(self.summary.clone()).await?;

        Ok(events)
    }
}

fn baseline_zones(tuning: &Level) -> Vec<ZoneValueEntity> {
    tuning
        .zones
        .iter()
        .enumerate()
        .map(|(zone, value)| ZoneValueEntity {
            zone,
            value: *value,
        })
        .collect()
}

fn zone_values(zones: &[ZoneValueEntity]) -> Vec<f64> {
    let mut values = vec![0.0; ZONE_COUNT];
    for zone in zones {
        if zone.zone < ZONE_COUNT {
            values[zone.zone] = zone.value;
        }
    }
    values
}
