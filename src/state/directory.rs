//! Registry of live socket connections.

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::dao::models::SessionEntity;

/// Identifier of one socket connection. A user reconnecting gets a new one.
pub type ConnectionId = Uuid;

/// Handle used to push messages to a connected peer.
#[derive(Clone)]
pub struct PeerHandle {
    pub conn: ConnectionId,
    pub tx: mpsc::UnboundedSender<Message>,
    pub session: SessionEntity,
    /// Scheduler connections receive no group broadcasts.
    pub is_cron: bool,
}

/// Live connections keyed by connection id.
///
/// Broadcast fan-out iterates the map; classroom-sized channels keep that
/// cheap.
#[derive(Default)]
pub struct SessionDirectory {
    peers: DashMap<ConnectionId, PeerHandle>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened connection.
    pub fn register(&self, peer: PeerHandle) {
        self.peers.insert(peer.conn, peer);
    }

    /// Drop a connection, returning its handle when it was known.
    pub fn unregister(&self, conn: ConnectionId) -> Option<PeerHandle> {
        self.peers.remove(&conn).map(|(_, peer)| peer)
    }

    /// Handle of one connection.
    pub fn get(&self, conn: ConnectionId) -> Option<PeerHandle> {
        self.peers.get(&conn).map(|entry| entry.clone())
    }

    /// Player connections of a group within an activity channel.
    ///
    /// Group 0 addresses the whole channel. Scheduler connections are skipped.
    pub fn group_peers(&self, cmid: i64, groupid: i64) -> Vec<PeerHandle> {
        self.peers
            .iter()
            .filter(|entry| {
                let peer = entry.value();
                !peer.is_cron
                    && peer.session.cmid == cmid
                    && (groupid == 0 || peer.session.groupid == groupid)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Player connections of a group across all channels, for scheduler fan-out.
    pub fn peers_of_group(&self, groupid: i64) -> Vec<PeerHandle> {
        self.peers
            .iter()
            .filter(|entry| {
                let peer = entry.value();
                !peer.is_cron && peer.session.groupid == groupid
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Whether a user has at least one live player connection on a channel.
    pub fn is_connected(&self, cmid: i64, userid: i64) -> bool {
        self.peers.iter().any(|entry| {
            let peer = entry.value();
            !peer.is_cron && peer.session.cmid == cmid && peer.session.userid == userid
        })
    }

    /// Number of live connections, scheduler ones included.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(cmid: i64, userid: i64, groupid: i64, is_cron: bool) -> PeerHandle {
        let (tx, _rx) = mpsc::unbounded_channel();
        PeerHandle {
            conn: Uuid::new_v4(),
            tx,
            session: SessionEntity {
                id: Uuid::new_v4(),
                cmid,
                userid,
                groupid,
                skey: format!("key-{userid}"),
                ip: "127.0.0.1".into(),
                firstping: 0,
                lastping: 0,
            },
            is_cron,
        }
    }

    #[test]
    fn group_peers_filters_channel_group_and_cron() {
        let directory = SessionDirectory::new();
        directory.register(peer(10, 1, 5, false));
        directory.register(peer(10, 2, 5, false));
        directory.register(peer(10, 3, 6, false));
        directory.register(peer(11, 4, 5, false));
        directory.register(peer(10, 0, 5, true));

        let group = directory.group_peers(10, 5);
        assert_eq!(group.len(), 2);

        let channel = directory.group_peers(10, 0);
        assert_eq!(channel.len(), 3);
    }

    #[test]
    fn unregister_returns_the_handle_once() {
        let directory = SessionDirectory::new();
        let handle = peer(10, 1, 5, false);
        let conn = handle.conn;
        directory.register(handle);

        assert!(directory.unregister(conn).is_some());
        assert!(directory.unregister(conn).is_none());
        assert!(!directory.is_connected(10, 1));
    }
}
