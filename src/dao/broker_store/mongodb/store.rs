use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::doc,
    options::{IndexOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{
    broker_store::BrokerStore,
    models::{
        CaseRole, CaseSummaryEntity, ChannelConfigEntity, ChatMessageEntity, CitySummaryEntity,
        CourseEntity, GroupEntity, LapseEntity, PlayedCardEntity, RunningStateEntity,
        SessionEntity, UserEntity,
    },
    storage::StorageResult,
};

const SESSIONS: &str = "sessions";
const CHANNELS: &str = "channels";
const USERS: &str = "users";
const GROUPS: &str = "groups";
const COURSES: &str = "courses";
const CASE_SUMMARIES: &str = "case_summaries";
const PLAYED_CARDS: &str = "played_cards";
const CITY_SUMMARIES: &str = "city_summaries";
const LAPSES: &str = "lapses";
const RUNNING: &str = "running";
const CHAT: &str = "chat";
const COUNTERS: &str = "counters";

/// Counter document backing monotonic chat message ids.
#[derive(Serialize, Deserialize)]
struct CounterDoc {
    #[serde(rename = "_id")]
    id: String,
    seq: i64,
}

#[derive(Clone)]
pub struct MongoBrokerStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoBrokerStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        self.create_index(
            &database,
            SESSIONS,
            "session_skey_idx",
            doc! {"skey": 1},
            true,
        )
        .await?;
        self.create_index(
            &database,
            PLAYED_CARDS,
            "played_card_slot_idx",
            doc! {"groupid": 1, "caseid": 1, "attempt": 1, "cardtype": 1},
            true,
        )
        .await?;
        self.create_index(
            &database,
            LAPSES,
            "lapse_game_idx",
            doc! {"groupid": 1, "game": 1, "lapse": -1},
            false,
        )
        .await?;
        self.create_index(
            &database,
            RUNNING,
            "running_game_idx",
            doc! {"groupid": 1, "game": 1},
            true,
        )
        .await?;
        self.create_index(&database, CHAT, "chat_group_idx", doc! {"groupid": 1, "id": -1}, false)
            .await?;

        Ok(())
    }

    async fn create_index(
        &self,
        database: &Database,
        collection: &'static str,
        name: &str,
        keys: mongodb::bson::Document,
        unique: bool,
    ) -> MongoResult<()> {
        let index = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(Some(name.to_owned()))
                    .unique(unique.then_some(true))
                    .build(),
            )
            .build();

        database
            .collection::<mongodb::bson::Document>(collection)
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection,
                index: "compound",
                source,
            })?;
        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<T>(name)
    }

    async fn find_one<T>(
        &self,
        collection: &'static str,
        filter: mongodb::bson::Document,
    ) -> MongoResult<Option<T>>
    where
        T: serde::de::DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::Query { collection, source })
    }

    async fn replace_one<T>(
        &self,
        collection: &'static str,
        filter: mongodb::bson::Document,
        document: &T,
    ) -> MongoResult<()>
    where
        T: serde::Serialize + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .replace_one(filter, document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write { collection, source })?;
        Ok(())
    }

    async fn next_chat_id(&self) -> MongoResult<i64> {
        let counters = self.collection::<CounterDoc>(COUNTERS).await;
        let updated = counters
            .find_one_and_update(doc! {"_id": "chat"}, doc! {"$inc": {"seq": 1}})
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: COUNTERS,
                source,
            })?;
        updated.map(|c| c.seq).ok_or(MongoDaoError::CounterMissing)
    }
}

impl BrokerStore for MongoBrokerStore {
    fn find_session_by_skey(
        &self,
        skey: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one(SESSIONS, doc! {"skey": skey})
                .await
                .map_err(Into::into)
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
            store
                .find_one(
                    SESSIONS,
                    doc! {"cmid": cmid, "userid": userid, "groupid": groupid},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_one(SESSIONS, doc! {"id": session.id.to_string()}, &session)
                .await
                .map_err(Into::into)
        })
    }

    fn find_channel_config(
        &self,
        cmid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<ChannelConfigEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one(CHANNELS, doc! {"cmid": cmid})
                .await
                .map_err(Into::into)
        })
    }

    fn find_user(&self, userid: i64) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one(USERS, doc! {"id": userid})
                .await
                .map_err(Into::into)
        })
    }

    fn find_group(&self, groupid: i64) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one(GROUPS, doc! {"id": groupid})
                .await
                .map_err(Into::into)
        })
    }

    fn find_course(
        &self,
        courseid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<CourseEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one(COURSES, doc! {"id": courseid})
                .await
                .map_err(Into::into)
        })
    }

    fn find_case_summary(
        &self,
        groupid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<CaseSummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one(CASE_SUMMARIES, doc! {"groupid": groupid})
                .await
                .map_err(Into::into)
        })
    }

    fn save_case_summary(
        &self,
        summary: CaseSummaryEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_one(CASE_SUMMARIES, doc! {"groupid": summary.groupid}, &summary)
                .await
                .map_err(Into::into)
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
            let collection = store.collection::<PlayedCardEntity>(PLAYED_CARDS).await;
            let cards = collection
                .find(doc! {"groupid": groupid, "caseid": caseid, "attempt": attempt as i32})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: PLAYED_CARDS,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: PLAYED_CARDS,
                    source,
                })?;
            Ok(cards)
        })
    }

    fn upsert_played_card(&self, card: PlayedCardEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let filter = doc! {
                "groupid": card.groupid,
                "caseid": card.caseid.clone(),
                "attempt": card.attempt as i32,
                "cardtype": card.cardtype.as_str(),
            };
            store
                .replace_one(PLAYED_CARDS, filter, &card)
                .await
                .map_err(Into::into)
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
            let collection = store.collection::<PlayedCardEntity>(PLAYED_CARDS).await;
            let result = collection
                .delete_one(doc! {
                    "groupid": groupid,
                    "caseid": caseid,
                    "attempt": attempt as i32,
                    "cardtype": cardtype.as_str(),
                })
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: PLAYED_CARDS,
                    source,
                })?;
            Ok(result.deleted_count > 0)
        })
    }

    fn find_city_summary(
        &self,
        groupid: i64,
    ) -> BoxFuture<'static, StorageResult<Option<CitySummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one(CITY_SUMMARIES, doc! {"groupid": groupid})
                .await
                .map_err(Into::into)
        })
    }

    fn save_city_summary(
        &self,
        summary: CitySummaryEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_one(CITY_SUMMARIES, doc! {"groupid": summary.groupid}, &summary)
                .await
                .map_err(Into::into)
        })
    }

    fn list_city_summaries(&self) -> BoxFuture<'static, StorageResult<Vec<CitySummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let collection = store.collection::<CitySummaryEntity>(CITY_SUMMARIES).await;
            let summaries = collection
                .find(doc! {})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: CITY_SUMMARIES,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: CITY_SUMMARIES,
                    source,
                })?;
            Ok(summaries)
        })
    }

    fn find_lapses(
        &self,
        groupid: i64,
        game: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<LapseEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let collection = store.collection::<LapseEntity>(LAPSES).await;
            let lapses = collection
                .find(doc! {"groupid": groupid, "game": game as i64})
                .sort(doc! {"lapse": -1})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: LAPSES,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: LAPSES,
                    source,
                })?;
            Ok(lapses)
        })
    }

    fn insert_lapse(&self, lapse: LapseEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let collection = store.collection::<LapseEntity>(LAPSES).await;
            collection
                .insert_one(&lapse)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: LAPSES,
                    source,
                })?;
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
            store
                .find_one(RUNNING, doc! {"groupid": groupid, "game": game as i64})
                .await
                .map_err(Into::into)
        })
    }

    fn save_running(
        &self,
        running: RunningStateEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let filter = doc! {"groupid": running.groupid, "game": running.game as i64};
            store
                .replace_one(RUNNING, filter, &running)
                .await
                .map_err(Into::into)
        })
    }

    fn append_chat(&self, message: ChatMessageEntity) -> BoxFuture<'static, StorageResult<i64>> {
        let store = self.clone();
        Box::pin(async move {
            let id = store.next_chat_id().await?;
            let mut stored = message;
            stored.id = id;
            let collection = store.collection::<ChatMessageEntity>(CHAT).await;
            collection
                .insert_one(&stored)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: CHAT,
                    source,
                })?;
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
            let mut filter = doc! {"groupid": {"$in": [groupid, 0]}};
            if let Some(cursor) = before_id {
                filter.insert("id", doc! {"$lt": cursor});
            }
            let collection = store.collection::<ChatMessageEntity>(CHAT).await;
            let messages = collection
                .find(filter)
                .sort(doc! {"id": -1})
                .limit(limit as i64)
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: CHAT,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: CHAT,
                    source,
                })?;
            Ok(messages)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
