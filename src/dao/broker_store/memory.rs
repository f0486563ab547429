//! In-memory [`BrokerStore`] backend for local runs and tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicI64, Ordering},
    },
};

use futures::future::BoxFuture;

use super::BrokerStore;
use crate::dao::{
    models::{
        CaseRole, CaseSummaryEntity, ChannelConfigEntity, ChatMessageEntity, CitySummaryEntity,
        CourseEntity, GroupEntity, LapseEntity, PlayedCardEntity, RunningStateEntity,
        SessionEntity, UserEntity,
    },
    storage::StorageResult,
};

#[derive(Default)]
struct MemoryInner {
    sessions: Mutex<Vec<SessionEntity>>,
    channels: Mutex<HashMap<i64, ChannelConfigEntity>>,
    users: Mutex<HashMap<i64, UserEntity>>,
    groups: Mutex<HashMap<i64, GroupEntity>>,
    courses: Mutex<HashMap<i64, CourseEntity>>,
    case_summaries: Mutex<HashMap<i64, CaseSummaryEntity>>,
    played_cards: Mutex<Vec<PlayedCardEntity>>,
    city_summaries: Mutex<HashMap<i64, CitySummaryEntity>>,
    lapses: Mutex<Vec<LapseEntity>>,
    running: Mutex<HashMap<(i64, u32), RunningStateEntity>>,
    chat: Mutex<Vec<ChatMessageEntity>>,
    chat_seq: AtomicI64,
}

/// Store backend that keeps everything in process memory.
///
/// State does not survive a restart; production deployments use the MongoDB
/// backend instead.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a platform user, for tests and local bootstrapping.
    pub fn seed_user(&self, user: UserEntity) {
        self.inner.users.lock().unwrap().insert(user.id, user);
    }

    /// Seed a group with its roster.
    pub fn seed_group(&self, group: GroupEntity) {
        self.inner.groups.lock().unwrap().insert(group.id, group);
    }

    /// Seed a course record.
    pub fn seed_course(&self, course: CourseEntity) {
        self.inner.courses.lock().unwrap().insert(course.id, course);
    }

    /// Seed the configuration of an activity channel.
    pub fn seed_channel(&self, config: ChannelConfigEntity) {
        self.inner
            .channels
            .lock()
            .unwrap()
            .insert(config.cmid, config);
    }
}

impl BrokerStore for MemoryStore {
    fn find_session_by_skey(
        &self,
        skey: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let sessions = store.inner.sessions.lock().unwrap();
            Ok(sessions.iter().find(|s| s.skey == skey).cloned())
        })
    }

    fn find_session_for(
        &self,
        cmid: i64,
        userid: i64,
        groupid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let sessions = store.inner.sessions.lock().unwrap();
            Ok(sessions
                .iter()
                .find(|s| s.cmid == cmid && s.userid == userid && s.groupid == groupid)
                .cloned())
        })
    }

    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut sessions = store.inner.sessions.lock().unwrap();
            match sessions.iter_mut().find(|s| s.id == session.id) {
                Some(existing) => *existing = session,
                None => sessions.push(session),
            }
            Ok(())
        })
    }

    fn find_channel_config(
        &self,
        cmid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<ChannelConfigEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.channels.lock().unwrap().get(&cmid).cloned()) })
    }

    fn find_user(&self, userid: i64) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.users.lock().unwrap().get(&userid).cloned()) })
    }

    fn find_group(&self, groupid: i64) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.groups.lock().unwrap().get(&groupid).cloned()) })
    }

    fn find_course(
        &self,
        courseid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<CourseEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.courses.lock().unwrap().get(&courseid).cloned()) })
    }

    fn find_case_summary(
        &self,
        groupid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<CaseSummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .case_summaries
                .lock()
                .unwrap()
                .get(&groupid)
                .cloned())
        })
    }

    fn save_case_summary(
        &self,
        summary: CaseSummaryEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .inner
                .case_summaries
                .lock()
                .unwrap()
                .insert(summary.groupid, summary);
            Ok(())
        })
    }

    fn find_played_cards(
        &self,
        groupid: i64,
        caseid: String,
        attempt: u8,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayedCardEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let cards = store.inner.played_cards.lock().unwrap();
            Ok(cards
                .iter()
                .filter(|c| c.groupid == groupid && c.caseid == caseid && c.attempt == attempt)
                .cloned()
                .collect())
        })
    }

    fn upsert_played_card(&self, card: PlayedCardEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut cards = store.inner.played_cards.lock().unwrap();
            match cards.iter_mut().find(|c| {
                c.groupid == card.groupid
                    && c.caseid == card.caseid
                    && c.attempt == card.attempt
                    && c.cardtype == card.cardtype
            }) {
                Some(existing) => *existing = card,
                None => cards.push(card),
            }
            Ok(())
        })
    }

    fn delete_played_card(
        &self,
        groupid: i64,
        caseid: String,
        attempt: u8,
        cardtype: CaseRole,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut cards = store.inner.played_cards.lock().unwrap();
            let before = cards.len();
            cards.retain(|c| {
                !(c.groupid == groupid
                    && c.caseid == caseid
                    && c.attempt == attempt
                    && c.cardtype == cardtype)
            });
            Ok(cards.len() < before)
        })
    }

    fn find_city_summary(
        &self,
        groupid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<CitySummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .city_summaries
                .lock()
                .unwrap()
                .get(&groupid)
                .cloned())
        })
    }

    fn save_city_summary(
        &self,
        summary: CitySummaryEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .inner
                .city_summaries
                .lock()
                .unwrap()
                .insert(summary.groupid, summary);
            Ok(())
        })
    }

    fn list_city_summaries(&self) -> BoxFuture<'static, StorageResult<Vec<CitySummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .city_summaries
                .lock()
                .unwrap()
                .values()
                .cloned()
                .collect())
        })
    }

    fn find_lapses(
        &self,
        groupid: i64,
        game: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<LapseEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let lapses = store.inner.lapses.lock().unwrap();
            let mut found: Vec<LapseEntity> = lapses
                .iter()
                .filter(|l| l.groupid == groupid && l.game == game)
                .cloned()
                .collect();
            found.sort_by(|a, b| b.lapse.cmp(&a.lapse));
            Ok(found)
        })
    }

    fn insert_lapse(&self, lapse: LapseEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.lapses.lock().unwrap().push(lapse);
            Ok(())
        })
    }

    fn find_running(
        &self,
        groupid: i64,
        game: u32,
    ) -> BoxFuture<'static, StorageResult<Option<RunningStateEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .running
                .lock()
                .unwrap()
                .get(&(groupid, game))
                .cloned())
        })
    }

    fn save_running(
        &self,
        running: RunningStateEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .inner
                .running
                .lock()
                .unwrap()
                .insert((running.groupid, running.game), running);
            Ok(())
        })
    }

    fn append_chat(&self, message: ChatMessageEntity) -> BoxFuture<'static, StorageResult<i64>> {
        let store = self.clone();
        Box::pin(async move {
            let id = store.inner.chat_seq.fetch_add(1, Ordering::SeqCst) + 1;
            let mut stored = message;
            stored.id = id;
            store.inner.chat.lock().unwrap().push(stored);
            Ok(id)
        })
    }

    fn chat_history(
        &self,
        groupid: i64,
        limit: u32,
        before_id: Option<i64>,
    ) -> BoxFuture<'static, StorageResult<Vec<ChatMessageEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let chat = store.inner.chat.lock().unwrap();
            let mut found: Vec<ChatMessageEntity> = chat
                .iter()
                .filter(|m| m.groupid == groupid || m.groupid == 0)
                .filter(|m| before_id.is_none_or(|cursor| m.id < cursor))
                .cloned()
                .collect();
            found.sort_by(|a, b| b.id.cmp(&a.id));
            found.truncate(limit as usize);
            Ok(found)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::SlotState;

    fn card(groupid: i64, cardtype: CaseRole, cardcode: &str) -> PlayedCardEntity {
        PlayedCardEntity {
            groupid,
            userid: 7,
            caseid: "john".into(),
            attempt: 1,
            cardtype,
            cardcode: cardcode.into(),
            timemodify: 100,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_card_of_same_type() {
        let store = MemoryStore::new();
        store
            .upsert_played_card(card(1, CaseRole::Tech, "john"))
            .await
            .unwrap();
        store
            .upsert_played_card(card(1, CaseRole::Tech, "natalia"))
            .await
            .unwrap();

        let cards = store.find_played_cards(1, "john".into(), 1).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].cardcode, "natalia");
    }

    #[tokio::test]
    async fn chat_history_pages_newest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let message = ChatMessageEntity {
                id: 0,
                groupid: 3,
                userid: 1,
                name: "Ada".into(),
                message: format!("msg {i}"),
                issystem: false,
                timestamp: 1000 + i,
            };
            store.append_chat(message).await.unwrap();
        }

        let page = store.chat_history(3, 2, None).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].message, "msg 4");

        let older = store.chat_history(3, 10, Some(page[1].id)).await.unwrap();
        assert_eq!(older.len(), 3);
        assert_eq!(older[0].message, "msg 2");
    }

    #[tokio::test]
    async fn group_zero_messages_visible_to_all_groups() {
        let store = MemoryStore::new();
        let broadcast = ChatMessageEntity {
            id: 0,
            groupid: 0,
            userid: 0,
            name: "System".into(),
            message: "maintenance".into(),
            issystem: true,
            timestamp: 1,
        };
        store.append_chat(broadcast).await.unwrap();

        let page = store.chat_history(9, 10, None).await.unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn lapses_come_back_newest_first() {
        let store = MemoryStore::new();
        for lapse in [2u32, 0, 1] {
            store
                .insert_lapse(LapseEntity {
                    groupid: 1,
                    game: 0,
                    lapse,
                    score: 89.0,
                    zones: Vec::new(),
                    reducer: None,
                    newresources: crate::dao::models::ResourcesEntity::zero(),
                    timemodify: 0,
                })
                .await
                .unwrap();
        }

        let lapses = store.find_lapses(1, 0).await.unwrap();
        let order: Vec<u32> = lapses.iter().map(|l| l.lapse).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn slot_state_terminality() {
        assert!(SlotState::Passed.is_terminal());
        assert!(!SlotState::Active.is_terminal());
    }
}
