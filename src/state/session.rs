use super::{AppState, GameError};
use crate::store::SESSION_KEYS;
use crate::types::*;

impl AppState {
    /// Wipe the session: log, cached usernames and the anon pool.
    ///
    /// The epoch is bumped so an AI reply still in flight is discarded when it lands.
    pub async fn reset_game(&self) -> Result<[Anon; 2], GameError> {
        let mut cycle = self.cycle.write().await;
        cycle.epoch += 1;
        cycle.phase = CyclePhase::Idle;
        cycle.ai_reply = None;
        cycle.human_reply = None;

        for key in SESSION_KEYS {
            self.store.remove_item(key).await?;
        }
        let pool = self.usernames.regenerate_anon_pool().await?;
        drop(cycle);

        tracing::info!("Game reset, new anon pool {} / {}", pool[0], pool[1]);
        Ok(pool)
    }
}
