//! Periodic simulation sweep.
//!
//! Every running city advances on a clock, not only when players act. The
//! sweep runs from an interval task and can also be forced through the
//! `execron` socket action by a scheduler connection.

use std::time::Duration;

use serde_json::json;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::{
    clock,
    dao::models::SummaryState,
    dto::ws::{ChatMessageView, OutboundEnvelope},
    error::ServiceError,
    games::city::{CityGame, CronEvent},
    services::{chat, dispatcher::send_frame},
    state::SharedState,
};

/// Seconds between automatic sweeps.
const SWEEP_PERIOD_SECS: u64 = 60;

/// Background task driving the sweep until the process shuts down.
pub async fn run(state: SharedState) {
    let mut ticker = interval(Duration::from_secs(SWEEP_PERIOD_SECS));
    loop {
        ticker.tick().await;
        if state.is_degraded().await {
            debug!("skipping simulation sweep in degraded mode");
            continue;
        }
        match sweep(&state, clock::now()).await {
            Ok(matches) => debug!(matches, "simulation sweep finished"),
            Err(err) => warn!(error = %err, "simulation sweep failed"),
        }
    }
}

/// Advance every running city once. Returns the number of games processed.
pub async fn sweep(state: &SharedState, now: i64) -> Result<u32, ServiceError> {
    let store = state.require_store().await?;
    let summaries = store.list_city_summaries().await?;

    let mut matches = 0;
    for summary in summaries {
        if summary.state == SummaryState::Ended {
            continue;
        }
        let groupid = summary.groupid;
        let members = store
            .find_group(groupid)
            .await?
            .map(|group| group.members)
            .unwrap_or_default();

        let mut game =
            CityGame::load(store.clone(), state.catalog(), groupid, &members, now).await?;
        let events = game.advance(now).await?;
        matches += 1;

        for event in events {
            fan_out(state, groupid, &event, now).await;
        }
    }
    Ok(matches)
}

/// Push one simulation event to every player of the group and mirror the
/// notable ones into the chat.
async fn fan_out(state: &SharedState, groupid: i64, event: &CronEvent, now: i64) {
    let (frame, notice) = match event {
        CronEvent::ActionCompleted {
            id,
            name,
            newresources,
        } => (
            OutboundEnvelope::new(
                "sc_actioncompleted",
                json!({"id": id, "name": name, "newresources": newresources}),
            ),
            Some(("sc_actioncompleted", Some(name.as_str()))),
        ),
        CronEvent::TechnologyCompleted { id, name, files } => (
            OutboundEnvelope::new(
                "sc_technologycompleted",
                json!({"id": id, "name": name, "files": files}),
            ),
            Some(("sc_technologycompleted", Some(name.as_str()))),
        ),
        CronEvent::HealthUpdate(health) => (
            OutboundEnvelope::new("sc_healthupdate", json!(health)),
            None,
        ),
        CronEvent::LapseChanged {
            score,
            lapse,
            lifetime,
        } => (
            OutboundEnvelope::new(
                "sc_lapsechanged",
                json!({"score": score, "lapse": lapse, "lifetime": lifetime}),
            ),
            None,
        ),
        CronEvent::AutoGameover { result, endlapse } => (
            OutboundEnvelope::new(
                "sc_autogameover",
                json!({"result": result, "endlapse": endlapse}),
            ),
            Some(("sc_autogameover", None)),
        ),
    };

    for peer in state.directory().peers_of_group(groupid) {
        send_frame(&peer, &frame);
    }

    if let Some((key, param)) = notice {
        match chat::post_system_notice(state, groupid, key, param, now).await {
            Ok(message) => {
                let chat_frame =
                    OutboundEnvelope::new("chatmsg", json!(ChatMessageView::from(&message)));
                for peer in state.directory().peers_of_group(groupid) {
                    send_frame(&peer, &chat_frame);
                }
            }
            Err(err) => warn!(error = %err, key, "failed to post simulation notice"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            broker_store::{BrokerStore, memory::MemoryStore},
            models::{GroupEntity, MemberEntity},
        },
        games::city::catalog::Catalog,
        state::AppState,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn sweep_counts_only_open_summaries() {
        let state = AppState::new(AppConfig::default(), Catalog::default());
        let store = MemoryStore::new();
        store.seed_group(GroupEntity {
            id: 5,
            courseid: 1,
            name: "Team".into(),
            members: vec![MemberEntity { id: 1, name: "Ada".into() }],
        });
        state.install_store(Arc::new(store.clone())).await;

        assert_eq!(sweep(&state, 1000).await.unwrap(), 0);

        let members = [MemberEntity { id: 1, name: "Ada".into() }];
        let mut game = CityGame::load(
            Arc::new(store.clone()),
            state.catalog(),
            5,
            &members,
            1000,
        )
        .await
        .unwrap();
        game.start(0, 1000).await.unwrap();

        assert_eq!(sweep(&state, 2000).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sweep_advances_lapses_for_running_games() {
        let state = AppState::new(AppConfig::default(), Catalog::default());
        let store = MemoryStore::new();
        store.seed_group(GroupEntity {
            id: 5,
            courseid: 1,
            name: "Team".into(),
            members: vec![MemberEntity { id: 1, name: "Ada".into() }],
        });
        state.install_store(Arc::new(store.clone())).await;

        let members = [MemberEntity { id: 1, name: "Ada".into() }];
        let mut game = CityGame::load(
            Arc::new(store.clone()),
            state.catalog(),
            5,
            &members,
            1000,
        )
        .await
        .unwrap();
        game.start(0, 1000).await.unwrap();

        sweep(&state, 1000 + 3700).await.unwrap();
        let lapses = store.find_lapses(5, 0).await.unwrap();
        assert_eq!(lapses.first().unwrap().lapse, 1);
    }
}
