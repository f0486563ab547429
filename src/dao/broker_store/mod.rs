//! Storage abstraction for sessions, game summaries and chat.

pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::{
    models::{
        CaseRole, CaseSummaryEntity, ChannelConfigEntity, ChatMessageEntity, CitySummaryEntity,
        CourseEntity, GroupEntity, LapseEntity, PlayedCardEntity, RunningStateEntity,
        SessionEntity, UserEntity,
    },
    storage::StorageResult,
};

/// Abstraction over the persistence layer for the broker.
///
/// Methods return `'static` futures so callers can hold the trait object behind
/// an `Arc` and move the future into spawned tasks.
pub trait BrokerStore: Send + Sync {
    /// Look up a session by its socket key.
    fn find_session_by_skey(
        &self,
        skey: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Look up the session for a user on an activity and group, if any.
    fn find_session_for(
        &self,
        cmid: i64,
        userid: i64,
        groupid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Insert or update a session keyed by its id.
    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Channel configuration for an activity instance.
    fn find_channel_config(
        &self,
        cmid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<ChannelConfigEntity>>>;
    /// Platform user record.
    fn find_user(&self, userid: i64) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Group record with roster.
    fn find_group(&self, groupid: i64) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>>;
    /// Course record.
    fn find_course(
        &self,
        courseid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<CourseEntity>>>;

    /// Case-game summary for a group.
    fn find_case_summary(
        &self,
        groupid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<CaseSummaryEntity>>>;
    /// Insert or update a case-game summary keyed by group.
    fn save_case_summary(
        &self,
        summary: CaseSummaryEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Cards played for one attempt at one case.
    fn find_played_cards(
        &self,
        groupid: i64,
        caseid: String,
        attempt: u8,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayedCardEntity>>>;
    /// Insert or replace the card of a given type for one attempt.
    fn upsert_played_card(&self, card: PlayedCardEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove the card of a given type for one attempt. Returns whether one existed.
    fn delete_played_card(
        &self,
        groupid: i64,
        caseid: String,
        attempt: u8,
        cardtype: CaseRole,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// City-game summary for a group.
    fn find_city_summary(
        &self,
        groupid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<CitySummaryEntity>>>;
    /// Insert or update a city-game summary keyed by group.
    fn save_city_summary(
        &self,
        summary: CitySummaryEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// All city-game summaries, for the simulation sweep.
    fn list_city_summaries(&self) -> BoxFuture<'static, StorageResult<Vec<CitySummaryEntity>>>;
    /// Lapse measurements of one game slot, newest first.
    fn find_lapses(
        &self,
        groupid: i64,
        game: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<LapseEntity>>>;
    /// Append a new lapse measurement.
    fn insert_lapse(&self, lapse: LapseEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Running actions and technologies of one game slot.
    fn find_running(
        &self,
        groupid: i64,
        game: u32,
    ) -> BoxFuture<'static, StorageResult<Option<RunningStateEntity>>>;
    /// Insert or update the running state keyed by (group, game).
    fn save_running(&self, running: RunningStateEntity)
    -> BoxFuture<'static, StorageResult<()>>;

    /// Append a chat message, assigning and returning its id.
    fn append_chat(&self, message: ChatMessageEntity) -> BoxFuture<'static, StorageResult<i64>>;
    /// Chat messages visible to a group, newest first, optionally before a given id.
    ///
    /// Messages stored with group 0 are visible to every group.
    fn chat_history(
        &self,
        groupid: i64,
        limit: u32,
        before_id: Option<i64>,
    ) -> BoxFuture<'static, StorageResult<Vec<ChatMessageEntity>>>;

    /// Cheap liveness probe against the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
