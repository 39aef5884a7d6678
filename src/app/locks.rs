// Per-game mutual exclusion - serializes requests that target the same game

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

/// Keyed async mutex, one slot per game number
///
/// Requests on different games never wait on each other.
#[derive(Default)]
pub struct GameLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one request on a game
pub struct GameGuard {
    game_number: String,
    _guard: OwnedMutexGuard<()>,
}

impl GameGuard {
    pub fn game_number(&self) -> &str {
        &self.game_number
    }
}

impl GameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other request holds `game_number`
    pub async fn acquire(&self, game_number: &str) -> GameGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            // Slots nobody holds or waits on can go
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots
                .entry(game_number.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = slot.lock_owned().await;
        trace!(game_number, "Game lock acquired");
        GameGuard {
            game_number: game_number.to_string(),
            _guard: guard,
        }
    }

    /// Number of games currently locked or awaited
    pub fn active(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots.values().filter(|slot| Arc::strong_count(slot) > 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_game_is_serialized() {
        let locks = Arc::new(GameLocks::new());
        let guard = locks.acquire("12").await;
        assert_eq!(guard.game_number(), "12");

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("12").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_games_do_not_block() {
        let locks = GameLocks::new();
        let _a = locks.acquire("1").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("2")).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_released_slots_are_pruned() {
        let locks = GameLocks::new();
        drop(locks.acquire("1").await);
        let _b = locks.acquire("2").await;
        assert_eq!(locks.slots.lock().unwrap().len(), 1);
    }
}
