//! Entity models persisted by the [`crate::dao::broker_store::BrokerStore`] backends.
//!
//! Field names follow the wire protocol so the same structs serialize both into
//! storage documents and into socket payloads without a mapping layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which simulation a channel runs. Stored per activity instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    /// Case-solving card game.
    Cases,
    /// City management simulation.
    City,
}

/// Lifecycle of a single case or city game slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Locked,
    Active,
    Passed,
    Failed,
}

impl SlotState {
    /// Terminal states never become active again.
    pub fn is_terminal(self) -> bool {
        matches!(self, SlotState::Passed | SlotState::Failed)
    }
}

/// Lifecycle of a whole game summary for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryState {
    Active,
    Ended,
}

/// Authenticated socket session bootstrapped over HTTP before the socket opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntity {
    pub id: Uuid,
    /// Activity instance the session belongs to.
    pub cmid: i64,
    pub userid: i64,
    /// Group the user plays with, 0 when none.
    pub groupid: i64,
    /// Random key presented by the socket client at connect time.
    pub skey: String,
    pub ip: String,
    pub firstping: i64,
    pub lastping: i64,
}

/// A platform user, as much of it as the broker needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntity {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    /// URL of the user's avatar.
    pub picture: String,
}

impl UserEntity {
    /// Display name used in chat and broadcast payloads.
    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

/// Lightweight group membership record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEntity {
    pub id: i64,
    pub name: String,
}

/// A course group and its roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEntity {
    pub id: i64,
    pub courseid: i64,
    pub name: String,
    pub members: Vec<MemberEntity>,
}

/// Course metadata surfaced in the session bootstrap payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseEntity {
    pub id: i64,
    pub shortname: String,
}

/// Per-activity channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfigEntity {
    pub cmid: i64,
    pub game: GameKind,
}

/// Roles a case team member can hold. Card types map one to one onto roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseRole {
    Planner,
    Tech,
    Media,
    Red,
    Master,
}

impl CaseRole {
    /// All roles, in assignment order.
    pub const ALL: [CaseRole; 5] = [
        CaseRole::Planner,
        CaseRole::Tech,
        CaseRole::Media,
        CaseRole::Red,
        CaseRole::Master,
    ];

    /// Parse a wire name into a role.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "planner" => Some(CaseRole::Planner),
            "tech" => Some(CaseRole::Tech),
            "media" => Some(CaseRole::Media),
            "red" => Some(CaseRole::Red),
            "master" => Some(CaseRole::Master),
            _ => None,
        }
    }

    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            CaseRole::Planner => "planner",
            CaseRole::Tech => "tech",
            CaseRole::Media => "media",
            CaseRole::Red => "red",
            CaseRole::Master => "master",
        }
    }
}

/// A team member together with the roles assigned for one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseMemberEntity {
    pub id: i64,
    pub name: String,
    pub roles: Vec<CaseRole>,
}

/// One case inside the case-game summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseEntity {
    /// Case code, also the expected card code when solving it.
    pub id: String,
    pub state: SlotState,
    /// 1 on the first try, 2 after a failed first attempt.
    pub attempt: u8,
    /// Timestamp of the last attempt resolution, 0 before any.
    pub lastattempt: i64,
    pub team: Vec<CaseMemberEntity>,
}

/// Case-game state for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSummaryEntity {
    pub groupid: i64,
    pub state: SummaryState,
    pub cases: Vec<CaseEntity>,
}

/// A card placed on the board during an attempt at a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayedCardEntity {
    pub groupid: i64,
    pub userid: i64,
    pub caseid: String,
    pub attempt: u8,
    pub cardtype: CaseRole,
    pub cardcode: String,
    pub timemodify: i64,
}

/// Consumable resource pools of a city game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourcesEntity {
    pub human: f64,
    pub physical: f64,
    pub energy: f64,
}

impl ResourcesEntity {
    /// All pools empty.
    pub fn zero() -> Self {
        Self {
            human: 0.0,
            physical: 0.0,
            energy: 0.0,
        }
    }
}

/// Technology capacity pool of a city game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechResourcesEntity {
    pub capacity: f64,
}

/// Simulated-time bookkeeping for a city game summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeControlEntity {
    /// Speed multiplier exponent base: 1 for 1x, 5 for 16x.
    pub timeframe: u8,
    pub starttime: i64,
    /// Accrued simulated seconds.
    pub timeelapsed: i64,
    /// Lapse index of the newest persisted measurement.
    pub lastmeasured: u32,
    /// Wall-clock instant of the last accrual.
    pub lastcalc: i64,
}

/// One playable slot of the city game. Groups get a fixed number of slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSlotEntity {
    pub id: u32,
    pub state: SlotState,
    pub score: f64,
    pub level: u8,
    pub starttime: i64,
    /// Catalog action ids assigned to each member, index-aligned with the roster.
    pub actions: Vec<Vec<String>>,
    /// Catalog technology ids assigned to each member, index-aligned with the roster.
    pub technologies: Vec<Vec<String>>,
}

/// City-game state for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitySummaryEntity {
    pub groupid: i64,
    pub state: SummaryState,
    pub games: Vec<GameSlotEntity>,
    pub timecontrol: TimeControlEntity,
}

/// Health of one city zone at a measurement point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneValueEntity {
    pub zone: usize,
    /// Satisfaction in [0, 1].
    pub value: f64,
}

/// One completed lapse measurement of a running city game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LapseEntity {
    pub groupid: i64,
    pub game: u32,
    pub lapse: u32,
    pub score: f64,
    pub zones: Vec<ZoneValueEntity>,
    /// Accumulated discontent, absent on the opening lapse.
    pub reducer: Option<f64>,
    /// Resources produced by actions completed during this lapse.
    pub newresources: ResourcesEntity,
    pub timemodify: i64,
}

/// An action or technology currently in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningItemEntity {
    pub id: String,
    /// Simulated-time second the item started at.
    pub starttime: i64,
}

/// A file produced by a finished technology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableFileEntity {
    pub id: String,
    pub creationtime: i64,
}

/// In-progress items and produced files of a running city game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningStateEntity {
    pub groupid: i64,
    pub game: u32,
    pub actions: Vec<RunningItemEntity>,
    pub technologies: Vec<RunningItemEntity>,
    pub availablefiles: Vec<AvailableFileEntity>,
}

impl RunningStateEntity {
    /// Empty running state for a fresh game slot.
    pub fn empty(groupid: i64, game: u32) -> Self {
        Self {
            groupid,
            game,
            actions: Vec::new(),
            technologies: Vec::new(),
            availablefiles: Vec::new(),
        }
    }
}

/// A chat message, either from a user or synthesized by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageEntity {
    pub id: i64,
    pub groupid: i64,
    /// 0 for broker-generated notifications.
    pub userid: i64,
    pub name: String,
    pub message: String,
    pub issystem: bool,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T>(value: &T) -> serde_json::Value
    where
        T: Serialize + serde::de::DeserializeOwned,
    {
        let encoded = serde_json::to_string(value).unwrap();
        let decoded: T = serde_json::from_str(&encoded).unwrap();
        serde_json::to_value(decoded).unwrap()
    }

    #[test]
    fn city_documents_survive_the_durable_representation() {
        let summary = CitySummaryEntity {
            groupid: 5,
            state: SummaryState::Active,
            games: vec![GameSlotEntity {
                id: 0,
                state: SlotState::Active,
                score: 87.25,
                level: 1,
                starttime: 1000,
                actions: vec![vec!["a1".into(), "a2".into()], vec!["a3".into()]],
                technologies: vec![vec!["t21".into()], vec!["t22".into()]],
            }],
            timecontrol: TimeControlEntity {
                timeframe: 5,
                starttime: 1000,
                timeelapsed: 7300,
                lastmeasured: 2,
                lastcalc: 1456,
            },
        };
        assert_eq!(round_trip(&summary), serde_json::to_value(&summary).unwrap());

        let running = RunningStateEntity {
            groupid: 5,
            game: 0,
            actions: vec![RunningItemEntity {
                id: "a1".into(),
                starttime: 10,
            }],
            technologies: vec![RunningItemEntity {
                id: "t24".into(),
                starttime: 20,
            }],
            availablefiles: vec![AvailableFileEntity {
                id: "f21".into(),
                creationtime: 3600,
            }],
        };
        assert_eq!(round_trip(&running), serde_json::to_value(&running).unwrap());

        let lapse = LapseEntity {
            groupid: 5,
            game: 0,
            lapse: 2,
            score: 85.479,
            zones: vec![
                ZoneValueEntity {
                    zone: 0,
                    value: 0.74,
                },
                ZoneValueEntity {
                    zone: 1,
                    value: 0.9,
                },
            ],
            reducer: Some(0.15),
            newresources: ResourcesEntity {
                human: 2.0,
                physical: 0.0,
                energy: 1.0,
            },
            timemodify: 8300,
        };
        assert_eq!(round_trip(&lapse), serde_json::to_value(&lapse).unwrap());

        // The opening lapse has no reducer yet; the absence must survive too.
        let opening = LapseEntity {
            reducer: None,
            ..lapse
        };
        assert_eq!(
            round_trip(&opening)["reducer"],
            serde_json::Value::Null
        );
    }
}
