//! Group chat persistence and rendering.

use crate::{
    dao::models::{ChatMessageEntity, SessionEntity, UserEntity},
    error::{DomainError, ServiceError},
    messages,
    state::SharedState,
};

/// Store a user-authored chat message, returning it with its assigned id.
pub async fn post_user_message(
    state: &SharedState,
    session: &SessionEntity,
    msg: String,
    now: i64,
) -> Result<ChatMessageEntity, ServiceError> {
    let store = state.require_store().await?;
    let user = store
        .find_user(session.userid)
        .await?
        .ok_or(DomainError::ChatNotAvailable)?;

    let mut message = ChatMessageEntity {
        id: 0,
        groupid: session.groupid,
        userid: session.userid,
        name: user.fullname(),
        message: msg,
        issystem: false,
        timestamp: now,
    };
    message.id = store.append_chat(message.clone()).await?;
    Ok(message)
}

/// Store a broker-generated notification about an action, rendered through the
/// message catalog with the actor's first name.
pub async fn post_action_notice(
    state: &SharedState,
    groupid: i64,
    action: &str,
    actor: Option<&UserEntity>,
    now: i64,
) -> Result<ChatMessageEntity, ServiceError> {
    post_system_notice(
        state,
        groupid,
        action,
        actor.map(|user| user.firstname.as_str()),
        now,
    )
    .await
}

/// Store a broker-generated notification rendered from a catalog key.
pub async fn post_system_notice(
    state: &SharedState,
    groupid: i64,
    key: &str,
    param: Option<&str>,
    now: i64,
) -> Result<ChatMessageEntity, ServiceError> {
    let store = state.require_store().await?;
    let text = messages::localize(&format!("message{key}"), param);

    let mut message = ChatMessageEntity {
        id: 0,
        groupid,
        userid: 0,
        name: String::new(),
        message: text,
        issystem: true,
        timestamp: now,
    };
    message.id = store.append_chat(message.clone()).await?;
    Ok(message)
}

/// Page through a group's chat, newest first.
pub async fn history(
    state: &SharedState,
    groupid: i64,
    page_size: Option<u32>,
    before_id: Option<i64>,
) -> Result<Vec<ChatMessageEntity>, ServiceError> {
    let store = state.require_store().await?;
    let limit = page_size.unwrap_or(state.config().chat_page_size);
    Ok(store.chat_history(groupid, limit, before_id).await?)
}
