//! Socket action dispatch.
//!
//! Every inbound frame names an action. The dispatcher validates the action
//! against the channel's game, runs the matching handler and fans results out
//! to the group. Failures travel back to the originating connection as error
//! frames and never interrupt the socket.

use serde_json::json;
use tracing::warn;
use validator::Validate;

use crate::{
    clock,
    dao::models::{GameKind, GroupEntity, SessionEntity},
    dto::ws::{
        ChangeTimeframeData, ChatHistoryData, ChatMessageView, ChatMsgData, ErrorPayload,
        GameItemData, GameStartData, InboundEnvelope, OutboundEnvelope, PlayCardData,
        UnplayCardData,
    },
    error::{DomainError, ServiceError},
    games::{
        cases::{CaseGame, CaseOutcome},
        city::CityGame,
    },
    messages,
    services::{chat, scheduler},
    state::{ConnectionId, PeerHandle, SharedState},
};

/// Actions a connection can name in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    ChatMsg,
    ChatHistory,
    GameState,
    PlayCard,
    UnplayCard,
    EndCase,
    PlayerConnected,
    PlayerDisconnected,
    GameStart,
    GameOver,
    PlayAction,
    StopAction,
    PlayTechnology,
    StopTechnology,
    ChangeTimeframe,
    GetHealth,
    ExeCron,
}

impl ActionKind {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "chatmsg" => ActionKind::ChatMsg,
            "chathistory" => ActionKind::ChatHistory,
            "gamestate" => ActionKind::GameState,
            "playcard" => ActionKind::PlayCard,
            "unplaycard" => ActionKind::UnplayCard,
            "endcase" => ActionKind::EndCase,
            "playerconnected" => ActionKind::PlayerConnected,
            "playerdisconnected" => ActionKind::PlayerDisconnected,
            "gamestart" => ActionKind::GameStart,
            "gameover" => ActionKind::GameOver,
            "playaction" => ActionKind::PlayAction,
            "stopaction" => ActionKind::StopAction,
            "playtechnology" => ActionKind::PlayTechnology,
            "stoptechnology" => ActionKind::StopTechnology,
            "changetimeframe" => ActionKind::ChangeTimeframe,
            "gethealth" => ActionKind::GetHealth,
            "execron" => ActionKind::ExeCron,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ChatMsg => "chatmsg",
            ActionKind::ChatHistory => "chathistory",
            ActionKind::GameState => "gamestate",
            ActionKind::PlayCard => "playcard",
            ActionKind::UnplayCard => "unplaycard",
            ActionKind::EndCase => "endcase",
            ActionKind::PlayerConnected => "playerconnected",
            ActionKind::PlayerDisconnected => "playerdisconnected",
            ActionKind::GameStart => "gamestart",
            ActionKind::GameOver => "gameover",
            ActionKind::PlayAction => "playaction",
            ActionKind::StopAction => "stopaction",
            ActionKind::PlayTechnology => "playtechnology",
            ActionKind::StopTechnology => "stoptechnology",
            ActionKind::ChangeTimeframe => "changetimeframe",
            ActionKind::GetHealth => "gethealth",
            ActionKind::ExeCron => "execron",
        }
    }

    /// Whether a client may name this action in a frame. Presence actions are
    /// emitted by the broker itself.
    fn client_reachable(self) -> bool {
        !matches!(
            self,
            ActionKind::PlayerConnected | ActionKind::PlayerDisconnected
        )
    }

    /// Whether the action belongs to the game a channel runs.
    fn permitted(self, kind: GameKind) -> bool {
        match self {
            ActionKind::ChatMsg
            | ActionKind::ChatHistory
            | ActionKind::GameState
            | ActionKind::PlayerConnected
            | ActionKind::PlayerDisconnected
            | ActionKind::ExeCron => true,
            ActionKind::PlayCard | ActionKind::UnplayCard | ActionKind::EndCase => {
                kind == GameKind::Cases
            }
            ActionKind::GameStart
            | ActionKind::GameOver
            | ActionKind::PlayAction
            | ActionKind::StopAction
            | ActionKind::PlayTechnology
            | ActionKind::StopTechnology
            | ActionKind::ChangeTimeframe
            | ActionKind::GetHealth => kind == GameKind::City,
        }
    }
}

/// Push a frame to one connection, dropping it when the writer is gone.
pub fn send_frame(peer: &PeerHandle, frame: &OutboundEnvelope) {
    if peer.tx.send(frame.to_message()).is_err() {
        warn!(conn = %peer.conn, "dropping frame for closed connection");
    }
}

/// Fan a frame out to a group's player connections.
///
/// Group 0 addresses the whole channel. `exclude` skips one connection,
/// typically the sender.
pub fn broadcast(
    state: &SharedState,
    cmid: i64,
    groupid: i64,
    frame: &OutboundEnvelope,
    exclude: Option<ConnectionId>,
) {
    for peer in state.directory().group_peers(cmid, groupid) {
        if Some(peer.conn) == exclude {
            continue;
        }
        send_frame(&peer, frame);
    }
}

/// Handle one inbound text frame, reporting failures back to the sender.
pub async fn dispatch(state: &SharedState, peer: &PeerHandle, raw: &str) {
    if let Err(err) = handle(state, peer, raw).await {
        let payload = match &err {
            ServiceError::Domain(domain) => ErrorPayload::from(domain),
            other => {
                warn!(conn = %peer.conn, error = %other, "action failed");
                ErrorPayload {
                    errorcode: "generalexception".to_owned(),
                    error: messages::localize("generalexception", Some(&other.to_string())),
                    stacktrace: String::new(),
                }
            }
        };
        let frame = OutboundEnvelope::new("error", json!(payload));
        send_frame(peer, &frame);
    }
}

async fn handle(state: &SharedState, peer: &PeerHandle, raw: &str) -> Result<(), ServiceError> {
    let envelope = InboundEnvelope::from_json_str(raw)?;
    let name = envelope.action()?;
    let kind = ActionKind::parse(name)
        .filter(|kind| kind.client_reachable())
        .ok_or_else(|| DomainError::InvalidAction(name.to_owned()))?;

    if kind == ActionKind::ExeCron {
        if !peer.is_cron {
            return Err(DomainError::InvalidAction(name.to_owned()).into());
        }
        let matches = scheduler::sweep(state, clock::now()).await?;
        let frame = OutboundEnvelope::new("execron", json!({ "SmartCity": { "matches": matches } }));
        send_frame(peer, &frame);
        return Ok(());
    }

    let game_kind = state.channel_kind(peer.session.cmid).await?;
    if !kind.permitted(game_kind) {
        return Err(DomainError::InvalidAction(name.to_owned()).into());
    }

    let now = clock::now();
    match kind {
        ActionKind::ChatMsg => chatmsg(state, peer, &envelope, now).await,
        ActionKind::ChatHistory => chathistory(state, peer, &envelope).await,
        ActionKind::GameState => gamestate(state, peer, game_kind, now).await,
        ActionKind::PlayCard => playcard(state, peer, &envelope, now).await,
        ActionKind::UnplayCard => unplaycard(state, peer, &envelope, now).await,
        ActionKind::EndCase => endcase(state, peer, now).await,
        ActionKind::GameStart => gamestart(state, peer, &envelope, now).await,
        ActionKind::GameOver => gameover(state, peer, now).await,
        ActionKind::PlayAction => play_item(state, peer, &envelope, kind, now).await,
        ActionKind::StopAction => stop_item(state, peer, &envelope, kind, now).await,
        ActionKind::PlayTechnology => play_item(state, peer, &envelope, kind, now).await,
        ActionKind::StopTechnology => stop_item(state, peer, &envelope, kind, now).await,
        ActionKind::ChangeTimeframe => changetimeframe(state, peer, &envelope, now).await,
        ActionKind::GetHealth => gethealth(state, peer, now).await,
        ActionKind::PlayerConnected
        | ActionKind::PlayerDisconnected
        | ActionKind::ExeCron => unreachable!("handled above"),
    }
}

/// Decode `data`, treating an absent object as the payload's default.
fn data_or_default<T>(envelope: &InboundEnvelope) -> Result<T, DomainError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if envelope.data.is_null() {
        Ok(T::default())
    } else {
        envelope.data_as()
    }
}

/// Resolve the group a session plays in, with roster.
async fn group_of(state: &SharedState, session: &SessionEntity) -> Result<GroupEntity, ServiceError> {
    if session.groupid == 0 {
        return Err(DomainError::NotGroupNotTeam.into());
    }
    let store = state.require_store().await?;
    store
        .find_group(session.groupid)
        .await?
        .ok_or_else(|| DomainError::NotGroupNotTeam.into())
}

async fn case_game(state: &SharedState, session: &SessionEntity) -> Result<CaseGame, ServiceError> {
    let group = group_of(state, session).await?;
    let store = state.require_store().await?;
    CaseGame::load(store, session.groupid, &group.members).await
}

async fn city_game(
    state: &SharedState,
    session: &SessionEntity,
    now: i64,
) -> Result<CityGame, ServiceError> {
    let group = group_of(state, session).await?;
    let store = state.require_store().await?;
    CityGame::load(store, state.catalog(), session.groupid, &group.members, now).await
}

fn exclusion(peer: &PeerHandle, envelope: &InboundEnvelope) -> Option<ConnectionId> {
    if envelope.tosender {
        None
    } else {
        Some(peer.conn)
    }
}

/// Post the catalog notice for an action into the group chat and push it to
/// everyone. Chat trouble never fails the action that triggered it.
async fn notify_action(state: &SharedState, session: &SessionEntity, action: &str, now: i64) {
    let actor = match state.require_store().await {
        Ok(store) => store.find_user(session.userid).await.ok().flatten(),
        Err(_) => None,
    };
    match chat::post_action_notice(state, session.groupid, action, actor.as_ref(), now).await {
        Ok(message) => {
            let frame = OutboundEnvelope::new("chatmsg", json!(ChatMessageView::from(&message)));
            broadcast(state, session.cmid, session.groupid, &frame, None);
        }
        Err(err) => warn!(error = %err, action, "failed to post action notice"),
    }
}

/// Announce a connection opening or closing to the rest of the group.
pub async fn notify_presence(
    state: &SharedState,
    session: &SessionEntity,
    connected: bool,
    exclude: Option<ConnectionId>,
) {
    let action = if connected {
        ActionKind::PlayerConnected
    } else {
        ActionKind::PlayerDisconnected
    };

    let name = match state.require_store().await {
        Ok(store) => store
            .find_user(session.userid)
            .await
            .ok()
            .flatten()
            .map(|user| user.fullname())
            .unwrap_or_default(),
        Err(_) => String::new(),
    };

    let frame = OutboundEnvelope::new(
        action.as_str(),
        json!({"user": {"id": session.userid, "name": name}}),
    );
    broadcast(state, session.cmid, session.groupid, &frame, exclude);
    let notice = if connected {
        "actionplayerconnected"
    } else {
        "actionplayerdisconnected"
    };
    notify_action(state, session, notice, clock::now()).await;
}

async fn chatmsg(
    state: &SharedState,
    peer: &PeerHandle,
    envelope: &InboundEnvelope,
    now: i64,
) -> Result<(), ServiceError> {
    let data: ChatMsgData = envelope.data_as()?;
    data.validate()
        .map_err(|_| DomainError::FieldRequired("msg"))?;

    let message = chat::post_user_message(state, &peer.session, data.msg, now).await?;
    let frame = OutboundEnvelope::from_user(
        "chatmsg",
        json!(ChatMessageView::from(&message)),
        peer.session.userid,
    );
    broadcast(
        state,
        peer.session.cmid,
        peer.session.groupid,
        &frame,
        exclusion(peer, envelope),
    );
    Ok(())
}

async fn chathistory(
    state: &SharedState,
    peer: &PeerHandle,
    envelope: &InboundEnvelope,
) -> Result<(), ServiceError> {
    let data: ChatHistoryData = data_or_default(envelope)?;
    let page: Vec<ChatMessageView> = chat::history(state, peer.session.groupid, data.n, data.s)
        .await?
        .iter()
        .map(ChatMessageView::from)
        .collect();
    let frame = OutboundEnvelope::new("chathistory", json!(page));
    send_frame(peer, &frame);
    Ok(())
}

async fn gamestate(
    state: &SharedState,
    peer: &PeerHandle,
    game_kind: GameKind,
    now: i64,
) -> Result<(), ServiceError> {
    let mut data = match game_kind {
        GameKind::Cases => {
            let game = case_game(state, &peer.session).await?;
            json!(game.state().await?)
        }
        GameKind::City => {
            let mut game = city_game(state, &peer.session, now).await?;
            json!(game.state(peer.session.userid, now).await?)
        }
    };

    // Decorate the snapshot with the server clock and who is online.
    let group = group_of(state, &peer.session).await?;
    let team: Vec<_> = group
        .members
        .iter()
        .map(|member| {
            json!({
                "id": member.id,
                "name": member.name,
                "connected": state
                    .directory()
                    .is_connected(peer.session.cmid, member.id),
            })
        })
        .collect();
    if let Some(object) = data.as_object_mut() {
        object.insert("currenttime".into(), json!(now));
        object.insert("team".into(), json!(team));
    }

    let frame = OutboundEnvelope::new("gamestate", data);
    send_frame(peer, &frame);
    Ok(())
}

async fn playcard(
    state: &SharedState,
    peer: &PeerHandle,
    envelope: &InboundEnvelope,
    now: i64,
) -> Result<(), ServiceError> {
    let data: PlayCardData = envelope.data_as()?;
    let mut game = case_game(state, &peer.session).await?;
    let card = game
        .play_card(peer.session.userid, &data.cardtype, &data.code, now)
        .await?;

    let frame = OutboundEnvelope::from_user("playcard", json!(card), peer.session.userid);
    broadcast(
        state,
        peer.session.cmid,
        peer.session.groupid,
        &frame,
        exclusion(peer, envelope),
    );
    notify_action(state, &peer.session, "actionplaycard", now).await;
    Ok(())
}

async fn unplaycard(
    state: &SharedState,
    peer: &PeerHandle,
    envelope: &InboundEnvelope,
    now: i64,
) -> Result<(), ServiceError> {
    let data: UnplayCardData = envelope.data_as()?;
    let mut game = case_game(state, &peer.session).await?;
    game.unplay_card(&data.cardtype).await?;

    let frame = OutboundEnvelope::from_user(
        "unplaycard",
        json!({"type": data.cardtype}),
        peer.session.userid,
    );
    broadcast(
        state,
        peer.session.cmid,
        peer.session.groupid,
        &frame,
        exclusion(peer, envelope),
    );
    notify_action(state, &peer.session, "actionunplaycard", now).await;
    Ok(())
}

async fn endcase(state: &SharedState, peer: &PeerHandle, now: i64) -> Result<(), ServiceError> {
    let mut game = case_game(state, &peer.session).await?;
    let outcome = game.end_current_case(now).await?;
    let view = game.state().await?;

    let result = match outcome {
        CaseOutcome::Passed => "passed",
        CaseOutcome::Retry => "retry",
        CaseOutcome::Failed => "failed",
    };
    let frame = OutboundEnvelope::from_user(
        "endcase",
        json!({"result": result, "state": view}),
        peer.session.userid,
    );
    // The verdict concerns the whole team, the sender included.
    broadcast(state, peer.session.cmid, peer.session.groupid, &frame, None);

    let notice = match outcome {
        CaseOutcome::Passed => "actioncasepassed",
        CaseOutcome::Retry => "actionattemptfailed",
        CaseOutcome::Failed => "actioncasefailed",
    };
    notify_action(state, &peer.session, notice, now).await;
    Ok(())
}

async fn gamestart(
    state: &SharedState,
    peer: &PeerHandle,
    envelope: &InboundEnvelope,
    now: i64,
) -> Result<(), ServiceError> {
    let data: GameStartData = data_or_default(envelope)?;
    let mut game = city_game(state, &peer.session, now).await?;
    let slot = game.start(data.level, now).await?;

    let frame = OutboundEnvelope::from_user("gamestart", json!(slot), peer.session.userid);
    broadcast(state, peer.session.cmid, peer.session.groupid, &frame, None);
    notify_action(state, &peer.session, "actiongamestart", now).await;
    Ok(())
}

async fn gameover(state: &SharedState, peer: &PeerHandle, now: i64) -> Result<(), ServiceError> {
    let mut game = city_game(state, &peer.session, now).await?;
    let view = game.gameover(now).await?;

    let frame = OutboundEnvelope::from_user("gameover", json!(view), peer.session.userid);
    broadcast(state, peer.session.cmid, peer.session.groupid, &frame, None);
    notify_action(state, &peer.session, "actiongameover", now).await;
    Ok(())
}

async fn play_item(
    state: &SharedState,
    peer: &PeerHandle,
    envelope: &InboundEnvelope,
    kind: ActionKind,
    now: i64,
) -> Result<(), ServiceError> {
    let data: GameItemData = envelope.data_as()?;
    let mut game = city_game(state, &peer.session, now).await?;
    let item = match kind {
        ActionKind::PlayAction => game.play_action(peer.session.userid, &data.id, now).await?,
        _ => {
            game.play_technology(peer.session.userid, &data.id, now)
                .await?
        }
    };

    let frame = OutboundEnvelope::from_user(kind.as_str(), json!(item), peer.session.userid);
    broadcast(
        state,
        peer.session.cmid,
        peer.session.groupid,
        &frame,
        exclusion(peer, envelope),
    );
    let notice = match kind {
        ActionKind::PlayAction => "actionplayaction",
        _ => "actionplaytechnology",
    };
    notify_action(state, &peer.session, notice, now).await;
    Ok(())
}

async fn stop_item(
    state: &SharedState,
    peer: &PeerHandle,
    envelope: &InboundEnvelope,
    kind: ActionKind,
    now: i64,
) -> Result<(), ServiceError> {
    let data: GameItemData = envelope.data_as()?;
    let mut game = city_game(state, &peer.session, now).await?;
    match kind {
        ActionKind::StopAction => game.stop_action(&data.id, now).await?,
        _ => game.stop_technology(&data.id, now).await?,
    }

    let frame = OutboundEnvelope::from_user(
        kind.as_str(),
        json!({"id": data.id}),
        peer.session.userid,
    );
    broadcast(
        state,
        peer.session.cmid,
        peer.session.groupid,
        &frame,
        exclusion(peer, envelope),
    );
    let notice = match kind {
        ActionKind::StopAction => "actionstopaction",
        _ => "actionstoptechnology",
    };
    notify_action(state, &peer.session, notice, now).await;
    Ok(())
}

async fn changetimeframe(
    state: &SharedState,
    peer: &PeerHandle,
    envelope: &InboundEnvelope,
    now: i64,
) -> Result<(), ServiceError> {
    let data: ChangeTimeframeData = envelope.data_as()?;
    let mut game = city_game(state, &peer.session, now).await?;
    let changed = game.change_timeframe(data.timeframe, now).await?;

    if changed {
        let frame = OutboundEnvelope::from_user(
            "changetimeframe",
            json!({"timeframe": data.timeframe}),
            peer.session.userid,
        );
        broadcast(
            state,
            peer.session.cmid,
            peer.session.groupid,
            &frame,
            exclusion(peer, envelope),
        );
        notify_action(state, &peer.session, "actionchangetimeframe", now).await;
    }
    Ok(())
}

async fn gethealth(state: &SharedState, peer: &PeerHandle, now: i64) -> Result<(), ServiceError> {
    let mut game = city_game(state, &peer.session, now).await?;
    let health = game.health(now).await?;
    let frame = OutboundEnvelope::new("gethealth", json!(health));
    send_frame(peer, &frame);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            broker_store::memory::MemoryStore,
            models::{GroupEntity, MemberEntity, UserEntity},
        },
        games::city::catalog::Catalog,
        state::AppState,
    };
    use axum::extract::ws::Message;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn user(id: i64, first: &str) -> UserEntity {
        UserEntity {
            id,
            firstname: first.into(),
            lastname: "Tester".into(),
            picture: String::new(),
        }
    }

    async fn seeded_state() -> SharedState {
        let state = AppState::new(AppConfig::default(), Catalog::default());
        let store = MemoryStore::new();
        store.seed_user(user(1, "Ada"));
        store.seed_user(user(2, "Grace"));
        store.seed_group(GroupEntity {
            id: 5,
            courseid: 1,
            name: "Team".into(),
            members: vec![
                MemberEntity { id: 1, name: "Ada Tester".into() },
                MemberEntity { id: 2, name: "Grace Tester".into() },
            ],
        });
        state.install_store(Arc::new(store)).await;
        state
    }

    fn peer_for(
        state: &SharedState,
        userid: i64,
        is_cron: bool,
    ) -> (PeerHandle, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = PeerHandle {
            conn: Uuid::new_v4(),
            tx,
            session: SessionEntity {
                id: Uuid::new_v4(),
                cmid: 11,
                userid,
                groupid: 5,
                skey: format!("key-{userid}"),
                ip: "127.0.0.1".into(),
                firstping: 0,
                lastping: 0,
            },
            is_cron,
        };
        state.directory().register(peer.clone());
        (peer, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let Message::Text(text) = message {
                frames.push(serde_json::from_str(&text).unwrap());
            }
        }
        frames
    }

    #[test]
    fn action_names_round_trip() {
        for name in [
            "chatmsg",
            "chathistory",
            "gamestate",
            "playcard",
            "unplaycard",
            "endcase",
            "gamestart",
            "gameover",
            "playaction",
            "stopaction",
            "playtechnology",
            "stoptechnology",
            "changetimeframe",
            "gethealth",
            "execron",
        ] {
            assert_eq!(ActionKind::parse(name).unwrap().as_str(), name);
        }
        assert!(ActionKind::parse("teleport").is_none());
    }

    #[test]
    fn game_actions_are_scoped_to_their_variant() {
        assert!(ActionKind::PlayCard.permitted(GameKind::Cases));
        assert!(!ActionKind::PlayCard.permitted(GameKind::City));
        assert!(ActionKind::GameStart.permitted(GameKind::City));
        assert!(!ActionKind::GameStart.permitted(GameKind::Cases));
        assert!(ActionKind::ChatMsg.permitted(GameKind::Cases));
        assert!(ActionKind::ChatMsg.permitted(GameKind::City));
    }

    #[test]
    fn presence_actions_are_not_client_reachable() {
        assert!(!ActionKind::PlayerConnected.client_reachable());
        assert!(!ActionKind::PlayerDisconnected.client_reachable());
        assert!(ActionKind::ChatMsg.client_reachable());
    }

    #[tokio::test]
    async fn chatmsg_reaches_the_group_but_not_the_sender() {
        let state = seeded_state().await;
        let (sender, mut sender_rx) = peer_for(&state, 1, false);
        let (_other, mut other_rx) = peer_for(&state, 2, false);

        dispatch(
            &state,
            &sender,
            r#"{"action": "chatmsg", "data": {"msg": "hello"}}"#,
        )
        .await;

        let received = drain(&mut other_rx);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["action"], "chatmsg");
        assert_eq!(received[0]["data"]["msg"], "hello");
        assert_eq!(received[0]["data"]["user"]["id"], 1);
        assert_eq!(received[0]["data"]["user"]["name"], "Ada Tester");
        assert!(drain(&mut sender_rx).is_empty());
    }

    #[tokio::test]
    async fn tosender_echoes_the_frame_back() {
        let state = seeded_state().await;
        let (sender, mut sender_rx) = peer_for(&state, 1, false);

        dispatch(
            &state,
            &sender,
            r#"{"action": "chatmsg", "data": {"msg": "hi"}, "tosender": true}"#,
        )
        .await;

        let received = drain(&mut sender_rx);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["action"], "chatmsg");
    }

    #[tokio::test]
    async fn invalid_action_errors_only_the_origin() {
        let state = seeded_state().await;
        let (sender, mut sender_rx) = peer_for(&state, 1, false);
        let (_other, mut other_rx) = peer_for(&state, 2, false);

        dispatch(&state, &sender, r#"{"action": "teleport"}"#).await;

        let received = drain(&mut sender_rx);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["action"], "error");
        assert_eq!(received[0]["data"]["errorcode"], "invalidaction");
        assert!(drain(&mut other_rx).is_empty());
    }

    #[tokio::test]
    async fn malformed_json_and_missing_action_report_protocol_errors() {
        let state = seeded_state().await;
        let (sender, mut sender_rx) = peer_for(&state, 1, false);

        dispatch(&state, &sender, "{broken").await;
        dispatch(&state, &sender, r#"{"data": {}}"#).await;

        let received = drain(&mut sender_rx);
        assert_eq!(received[0]["data"]["errorcode"], "invalidjson");
        assert_eq!(received[1]["data"]["errorcode"], "actionrequired");
    }

    #[tokio::test]
    async fn city_actions_are_rejected_on_case_channels() {
        let state = seeded_state().await;
        let (sender, mut sender_rx) = peer_for(&state, 1, false);

        dispatch(&state, &sender, r#"{"action": "gamestart"}"#).await;

        let received = drain(&mut sender_rx);
        assert_eq!(received[0]["data"]["errorcode"], "invalidaction");
    }

    #[tokio::test]
    async fn execron_requires_a_scheduler_connection() {
        let state = seeded_state().await;
        let (player, mut player_rx) = peer_for(&state, 1, false);
        let (cron, mut cron_rx) = peer_for(&state, 1, true);

        dispatch(&state, &player, r#"{"action": "execron"}"#).await;
        let received = drain(&mut player_rx);
        assert_eq!(received[0]["data"]["errorcode"], "invalidaction");

        dispatch(&state, &cron, r#"{"action": "execron"}"#).await;
        let received = drain(&mut cron_rx);
        assert_eq!(received[0]["action"], "execron");
        assert!(received[0]["data"]["SmartCity"]["matches"].is_number());
    }

    #[tokio::test]
    async fn playcard_fans_out_and_posts_a_notice() {
        let state = seeded_state().await;
        let (sender, _sender_rx) = peer_for(&state, 1, false);
        let (_other, mut other_rx) = peer_for(&state, 2, false);

        // Learn the sender's role for the active case.
        let game = case_game(&state, &sender.session).await.unwrap();
        let current = game.current_case().unwrap().clone();
        let role = current
            .team
            .iter()
            .find(|member| member.id == 1)
            .unwrap()
            .roles[0];
        drop(game);

        let frame = format!(
            r#"{{"action": "playcard", "data": {{"type": "{}", "code": "{}"}}}}"#,
            role.as_str(),
            current.id
        );
        dispatch(&state, &sender, &frame).await;

        let received = drain(&mut other_rx);
        assert_eq!(received.len(), 2);
        assert_eq!(received[0]["action"], "playcard");
        assert_eq!(received[0]["user"], 1);
        assert_eq!(received[1]["action"], "chatmsg");
        assert_eq!(received[1]["data"]["issystem"], true);
    }

    #[tokio::test]
    async fn failed_playcard_does_not_mutate_the_board() {
        let state = seeded_state().await;
        let (sender, mut sender_rx) = peer_for(&state, 1, false);

        dispatch(
            &state,
            &sender,
            r#"{"action": "playcard", "data": {"type": "tech", "code": "bogus"}}"#,
        )
        .await;

        let received = drain(&mut sender_rx);
        assert_eq!(received[0]["data"]["errorcode"], "invalidcardcode");

        let game = case_game(&state, &sender.session).await.unwrap();
        let view = game.state().await.unwrap();
        assert!(view.playedcards.is_empty());
    }
}
