use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OwnedMutexGuard;

use flowdesk_core::types::SessionId;

type Lanes = Arc<Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>>;

fn lock(lanes: &Lanes) -> MutexGuard<'_, HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>> {
    lanes.lock().unwrap_or_else(|e| e.into_inner())
}

/// Per-session lock ensuring serial execution of everything that touches
/// one session: interpreter runs, delay continuations and operator actions.
///
/// A lane exists only while someone holds or waits on it.
#[derive(Default)]
pub struct LaneMap {
    lanes: Lanes,
}

/// Exclusive access to one session. Dropping it frees the lane, and
/// forgets it when nobody else is waiting.
pub struct LaneGuard {
    sid: SessionId,
    guard: Option<OwnedMutexGuard<()>>,
    lanes: Lanes,
}

impl Drop for LaneGuard {
    fn drop(&mut self) {
        let mut lanes = lock(&self.lanes);
        self.guard.take();
        if lanes
            .get(&self.sid)
            .is_some_and(|lane| Arc::strong_count(lane) == 1)
        {
            lanes.remove(&self.sid);
        }
    }
}

impl LaneMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the session's lane.
    pub async fn acquire(&self, sid: &SessionId) -> LaneGuard {
        let lane = lock(&self.lanes).entry(sid.clone()).or_default().clone();
        let guard = lane.lock_owned().await;
        LaneGuard {
            sid: sid.clone(),
            guard: Some(guard),
            lanes: self.lanes.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.lanes).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_session_is_serialised() {
        let lanes = Arc::new(LaneMap::new());
        let sid = SessionId::from_string("chat_1");
        let order = Arc::new(Mutex::new(Vec::new()));

        let guard = lanes.acquire(&sid).await;
        let waiter = {
            let lanes = lanes.clone();
            let sid = sid.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let _g = lanes.acquire(&sid).await;
                order.lock().unwrap().push("second");
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        order.lock().unwrap().push("first");
        drop(guard);
        waiter.await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_other_sessions_not_blocked() {
        let lanes = LaneMap::new();
        let _a = lanes.acquire(&SessionId::from_string("a")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            lanes.acquire(&SessionId::from_string("b")),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_lane_forgotten_once_released() {
        let lanes = LaneMap::new();
        let held = lanes.acquire(&SessionId::from_string("a")).await;
        drop(lanes.acquire(&SessionId::from_string("b")).await);
        assert_eq!(lanes.len(), 1);

        drop(held);
        assert_eq!(lanes.len(), 0);
    }

    #[tokio::test]
    async fn test_lane_kept_while_someone_waits() {
        let lanes = Arc::new(LaneMap::new());
        let sid = SessionId::from_string("a");
        let held = lanes.acquire(&sid).await;

        let waiter = {
            let lanes = lanes.clone();
            let sid = sid.clone();
            tokio::spawn(async move {
                let _g = lanes.acquire(&sid).await;
                lanes.len()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        // The waiter got the same lane rather than a fresh one.
        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(lanes.len(), 0);
    }
}
