//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Session registry
//!
//! The registry is the only structure shared by the acceptor, every session
//! reader and any handler that sends, broadcasts or disconnects. It is backed
//! by a sharded concurrent map so unrelated sessions never contend on a single
//! lock.

use crate::{ClientSession, Result, ServiceError, SessionId};
use cmdwire_codec::Frame;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::counter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a broadcast operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Number of sessions a send was attempted on
    pub total: usize,
    /// Number of successful sends
    pub succeeded: usize,
    /// Number of failed sends
    pub failed: usize,
}

impl BroadcastResult {
    /// Check if all sends succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Live sessions keyed by id, plus the id sequence
pub(crate) struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<ClientSession>>,
    // Last issued id. Held while a new session is allocated and inserted and
    // while `disconnect_all` clears the map, so a reset never races an insert.
    last_id: Mutex<u64>,
    total: AtomicU64,
}

impl SessionRegistry {
    pub(crate) fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            last_id: Mutex::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Allocate the next id (starting from 1), build a session for it with
    /// `open` and register it, all under the id sequence lock.
    ///
    /// `open` runs while the lock is held and must not block.
    pub(crate) async fn open_session<T, F>(&self, open: F) -> Result<(Arc<ClientSession>, T)>
    where
        F: FnOnce(SessionId) -> Result<(Arc<ClientSession>, T)>,
    {
        let (session, extra, inserted) = {
            let mut last_id = self.last_id.lock().unwrap_or_else(PoisonError::into_inner);
            *last_id += 1;
            let (session, extra) = open(SessionId::new(*last_id))?;
            let inserted = self.put(session.clone());
            (session, extra, inserted)
        };

        if !inserted {
            warn!(session_id = %session.id(), "Session id already registered, closing new session");
            session.disconnect().await;
            return Err(ServiceError::DuplicateSession(session.id()));
        }
        Ok((session, extra))
    }

    /// Register a session under its id. Never replaces an existing entry;
    /// returns `false` when the id is taken.
    pub(crate) fn put(&self, session: Arc<ClientSession>) -> bool {
        match self.sessions.entry(session.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(session);
                self.total.fetch_add(1, Ordering::Relaxed);
                true
            }
        }
    }

    pub(crate) fn get(&self, id: SessionId) -> Option<Arc<ClientSession>> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    pub(crate) fn remove(&self, id: SessionId) -> Option<Arc<ClientSession>> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    /// Remove `session` only if it is still the entry registered under its id.
    ///
    /// Ids are reused after `disconnect_all`, so a late reader must not evict
    /// a newer session that happens to carry the same id.
    pub(crate) fn remove_session(&self, session: &Arc<ClientSession>) -> bool {
        self.sessions
            .remove_if(&session.id(), |_, current| Arc::ptr_eq(current, session))
            .is_some()
    }

    /// Point-in-time copy of the registered sessions
    pub(crate) fn snapshot(&self) -> Vec<Arc<ClientSession>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub(crate) fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(&Arc<ClientSession>),
    {
        for session in self.snapshot() {
            action(&session);
        }
    }

    pub(crate) fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Sessions registered since the registry was created
    pub(crate) fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Disconnect and forget every session, then restart ids at 1.
    ///
    /// Returns the sessions that were registered so the caller can report them.
    pub(crate) async fn disconnect_all(&self) -> Vec<Arc<ClientSession>> {
        let sessions = {
            let mut last_id = self.last_id.lock().unwrap_or_else(PoisonError::into_inner);
            let sessions = self.snapshot();
            self.sessions.clear();
            *last_id = 0;
            sessions
        };

        futures_util::future::join_all(sessions.iter().map(|session| session.disconnect())).await;

        if !sessions.is_empty() {
            info!(count = sessions.len(), "Disconnected all sessions");
        }
        sessions
    }

    /// Send a frame to every registered session, optionally skipping one.
    ///
    /// A failed send never stops delivery to the others. Each delivery is
    /// bounded by `limit`; a session still blocked after that counts as failed.
    pub(crate) async fn broadcast(
        &self,
        frame: &Frame,
        except: Option<SessionId>,
        limit: Duration,
    ) -> BroadcastResult {
        let targets: Vec<Arc<ClientSession>> = self
            .snapshot()
            .into_iter()
            .filter(|session| Some(session.id()) != except)
            .collect();

        let sends = targets.iter().map(|session| async move {
            match tokio::time::timeout(limit, session.send(frame)).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    debug!(session_id = %session.id(), error = %e, "Broadcast send failed");
                    false
                }
                Err(_) => {
                    warn!(session_id = %session.id(), "Broadcast send timed out");
                    false
                }
            }
        });
        let outcomes = futures_util::future::join_all(sends).await;

        let succeeded = outcomes.iter().filter(|delivered| **delivered).count();
        let result = BroadcastResult {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        };
        if result.failed > 0 {
            counter!("cmdwire.broadcast.failed").increment(result.failed as u64);
        }
        result
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("session_count", &self.len())
            .field(
                "last_id",
                &*self.last_id.lock().unwrap_or_else(PoisonError::into_inner),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FrameStream;
    use crate::session::tests::{session_pair, socket_pair};
    use cmdwire_codec::FrameCodec;
    use futures_util::StreamExt;
    use tokio::net::TcpStream;
    use tokio_util::codec::FramedRead;

    const LIMIT: Duration = Duration::from_secs(2);

    async fn open_next(registry: &SessionRegistry) -> (Arc<ClientSession>, FrameStream, TcpStream) {
        let (socket, client) = socket_pair().await;
        let (session, frames) = registry
            .open_session(|id| ClientSession::open(id, socket, FrameCodec::new()))
            .await
            .unwrap();
        (session, frames, client)
    }

    #[tokio::test]
    async fn test_ids_start_at_one() {
        let registry = SessionRegistry::new();
        let mut keep = Vec::new();
        for expected in 1..=3 {
            let (session, frames, client) = open_next(&registry).await;
            assert_eq!(session.id(), SessionId::new(expected));
            keep.push((frames, client));
        }
        assert_eq!(registry.ids().len(), 3);
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let registry = SessionRegistry::new();
        let (session, _frames, _client) = session_pair(1).await;

        assert!(registry.put(session.clone()));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(SessionId::new(1)).is_some());
        assert_eq!(registry.ids(), vec![SessionId::new(1)]);

        assert!(registry.remove(SessionId::new(1)).is_some());
        assert!(registry.get(SessionId::new(1)).is_none());
        assert_eq!(registry.total(), 1);
    }

    #[tokio::test]
    async fn test_put_refuses_occupied_id() {
        let registry = SessionRegistry::new();
        let (first, _f1, _c1) = session_pair(1).await;
        let (second, _f2, _c2) = session_pair(1).await;

        assert!(registry.put(first.clone()));
        assert!(!registry.put(second));
        let registered = registry.get(SessionId::new(1)).unwrap();
        assert!(Arc::ptr_eq(&registered, &first));
        assert_eq!(registry.total(), 1);
    }

    #[tokio::test]
    async fn test_open_session_never_evicts_late_registration() {
        let registry = SessionRegistry::new();
        registry.disconnect_all().await;

        // Registered after the reset under an id the new sequence hands out again
        let (late, _f1, _c1) = session_pair(1).await;
        assert!(registry.put(late.clone()));

        let (socket, _client) = socket_pair().await;
        let result = registry
            .open_session(|id| ClientSession::open(id, socket, FrameCodec::new()))
            .await;
        assert!(matches!(result, Err(ServiceError::DuplicateSession(id)) if id == SessionId::new(1)));

        let registered = registry.get(SessionId::new(1)).unwrap();
        assert!(Arc::ptr_eq(&registered, &late));
        assert!(late.is_connected());

        let (next, _f2, _c2) = open_next(&registry).await;
        assert_eq!(next.id(), SessionId::new(2));
    }

    #[tokio::test]
    async fn test_remove_session_ignores_replacement() {
        let registry = SessionRegistry::new();
        let (stale, _f1, _c1) = session_pair(1).await;
        let (fresh, _f2, _c2) = session_pair(1).await;

        registry.put(fresh.clone());
        assert!(!registry.remove_session(&stale));
        assert!(registry.get(SessionId::new(1)).is_some());
        assert!(registry.remove_session(&fresh));
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure() {
        let registry = SessionRegistry::new();
        let mut peers = Vec::new();
        for id in 1..=3 {
            let (session, frames, client) = session_pair(id).await;
            registry.put(session);
            peers.push((frames, FramedRead::new(client, FrameCodec::new())));
        }
        registry.get(SessionId::new(2)).unwrap().disconnect().await;

        let frame = Frame::command("NEWS", ["hello"]);
        let result = registry.broadcast(&frame, None, LIMIT).await;
        assert_eq!(result.total, 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert!(!result.all_succeeded());

        for index in [0, 2] {
            let payload = peers[index].1.next().await.unwrap().unwrap();
            assert_eq!(FrameCodec::new().parse(&payload).unwrap(), frame);
        }
    }

    #[tokio::test]
    async fn test_broadcast_except_skips_session() {
        let registry = SessionRegistry::new();
        let mut keep = Vec::new();
        for id in 1..=2 {
            let (session, frames, client) = session_pair(id).await;
            registry.put(session);
            keep.push((frames, client));
        }

        let result = registry
            .broadcast(&Frame::command("NEWS", ["x"]), Some(SessionId::new(1)), LIMIT)
            .await;
        assert_eq!(result.total, 1);
        assert!(result.all_succeeded());
    }

    #[tokio::test]
    async fn test_broadcast_times_out_on_stalled_session() {
        let registry = SessionRegistry::new();
        let (stalled, _frames, _client) = session_pair(1).await;
        registry.put(stalled.clone());

        // Nobody reads the client side, so the socket buffers fill up
        let bulk = Frame::command("BULK", ["x".repeat(60_000)]);
        let limit = Duration::from_millis(200);
        let mut timed_out = false;
        for _ in 0..1_000 {
            if registry.broadcast(&bulk, None, limit).await.failed == 1 {
                timed_out = true;
                break;
            }
        }
        assert!(timed_out);
        assert!(stalled.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_all_resets_ids() {
        let registry = SessionRegistry::new();
        let mut keep = Vec::new();
        for _ in 0..2 {
            let (_session, frames, client) = open_next(&registry).await;
            keep.push((frames, client));
        }

        let closed = registry.disconnect_all().await;
        assert_eq!(closed.len(), 2);
        assert!(closed.iter().all(|session| !session.is_connected()));
        assert_eq!(registry.len(), 0);

        let mut visited = 0;
        registry.for_each(|_| visited += 1);
        assert_eq!(visited, 0);

        let (session, _frames, _client) = open_next(&registry).await;
        assert_eq!(session.id(), SessionId::new(1));
    }
}
