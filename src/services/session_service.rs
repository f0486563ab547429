//! Session bootstrap: the HTTP handshake that precedes the socket connection.

use rand::{Rng, distr::Alphanumeric};
use uuid::Uuid;

use crate::{
    dao::models::SessionEntity,
    dto::session::{BootstrapQuery, BootstrapResponse},
    error::{DomainError, ServiceError},
    state::SharedState,
};

/// Length of the generated session key.
const SKEY_LEN: usize = 32;

fn generate_skey() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SKEY_LEN)
        .map(char::from)
        .collect()
}

/// Create or refresh the session for a user on an activity channel and return
/// the socket bootstrap record.
///
/// Reconnecting reuses the existing session, refreshing its address and ping
/// timestamps so the key stays stable across page reloads.
pub async fn bootstrap(
    state: &SharedState,
    query: &BootstrapQuery,
    ip: String,
    now: i64,
) -> Result<BootstrapResponse, ServiceError> {
    let store = state.require_store().await?;

    let user = store
        .find_user(query.userid)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {}", query.userid)))?;

    let group = match query.groupid {
        0 => None,
        groupid => Some(
            store
                .find_group(groupid)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("group {groupid}")))?,
        ),
    };
    if let Some(group) = &group
        && !group.members.iter().any(|member| member.id == user.id)
    {
        return Err(DomainError::UserNotInGroup.into());
    }

    let course = match &group {
        Some(group) => store.find_course(group.courseid).await?,
        None => None,
    };

    let session = match store
        .find_session_for(query.cmid, query.userid, query.groupid)
        .await?
    {
        Some(mut existing) => {
            existing.ip = ip;
            existing.lastping = now;
            existing
        }
        None => SessionEntity {
            id: Uuid::new_v4(),
            cmid: query.cmid,
            userid: query.userid,
            groupid: query.groupid,
            skey: generate_skey(),
            ip,
            firstping: now,
            lastping: now,
        },
    };
    store.save_session(session.clone()).await?;

    Ok(BootstrapResponse {
        skey: session.skey,
        cmid: session.cmid,
        userid: session.userid,
        usernames: user.fullname(),
        userpicture: user.picture,
        courseid: course.as_ref().map(|c| c.id).unwrap_or(0),
        courseshortname: course.map(|c| c.shortname).unwrap_or_default(),
        groupid: session.groupid,
        groupname: group.map(|g| g.name).unwrap_or_default(),
        serverurl: state.config().server_url.clone(),
    })
}

/// Resolve and refresh the session presented by a connecting socket.
pub async fn authenticate(
    state: &SharedState,
    skey: &str,
    now: i64,
) -> Result<SessionEntity, ServiceError> {
    if skey.is_empty() {
        return Err(DomainError::SkeyRequired.into());
    }
    let store = state.require_store().await?;
    let mut session = store
        .find_session_by_skey(skey.to_owned())
        .await?
        .ok_or(DomainError::InvalidKey)?;
    session.lastping = now;
    store.save_session(session.clone()).await?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            broker_store::memory::MemoryStore,
            models::{CourseEntity, GroupEntity, MemberEntity, UserEntity},
        },
        games::city::catalog::Catalog,
        state::AppState,
    };
    use std::sync::Arc;

    async fn seeded_state() -> SharedState {
        let state = AppState::new(AppConfig::default(), Catalog::default());
        let store = MemoryStore::new();
        store.seed_user(UserEntity {
            id: 7,
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            picture: "https://example.test/ada.png".into(),
        });
        store.seed_group(GroupEntity {
            id: 3,
            courseid: 2,
            name: "Team A".into(),
            members: vec![MemberEntity {
                id: 7,
                name: "Ada Lovelace".into(),
            }],
        });
        store.seed_course(CourseEntity {
            id: 2,
            shortname: "SIM101".into(),
        });
        state.install_store(Arc::new(store)).await;
        state
    }

    fn query() -> BootstrapQuery {
        BootstrapQuery {
            cmid: 11,
            userid: 7,
            groupid: 3,
        }
    }

    #[tokio::test]
    async fn bootstrap_creates_a_session_and_reuses_it() {
        let state = seeded_state().await;

        let first = bootstrap(&state, &query(), "10.0.0.1".into(), 100)
            .await
            .unwrap();
        assert_eq!(first.skey.len(), SKEY_LEN);
        assert_eq!(first.usernames, "Ada Lovelace");
        assert_eq!(first.courseshortname, "SIM101");
        assert_eq!(first.groupname, "Team A");

        let second = bootstrap(&state, &query(), "10.0.0.2".into(), 200)
            .await
            .unwrap();
        assert_eq!(second.skey, first.skey);
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_members() {
        let state = seeded_state().await;
        let store = state.require_store().await.unwrap();
        store
            .find_user(7)
            .await
            .unwrap()
            .expect("seeded user exists");

        let outsider = BootstrapQuery {
            cmid: 11,
            userid: 99,
            groupid: 3,
        };
        // Unknown users are rejected before group checks.
        assert!(matches!(
            bootstrap(&state, &outsider, "10.0.0.1".into(), 100)
                .await
                .unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn authenticate_round_trips_the_key() {
        let state = seeded_state().await;
        let record = bootstrap(&state, &query(), "10.0.0.1".into(), 100)
            .await
            .unwrap();

        let session = authenticate(&state, &record.skey, 150).await.unwrap();
        assert_eq!(session.userid, 7);
        assert_eq!(session.lastping, 150);

        assert!(matches!(
            authenticate(&state, "wrong", 150).await.unwrap_err(),
            ServiceError::Domain(DomainError::InvalidKey)
        ));
        assert!(matches!(
            authenticate(&state, "", 150).await.unwrap_err(),
            ServiceError::Domain(DomainError::SkeyRequired)
        ));
    }
}
