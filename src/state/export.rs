//! Session export/import for backup and restoration.
//!
//! Snapshots carry the turn log and the cached identifiers. The in-memory
//! prompt cycle is not exported; an unanswered prompt is picked up again on
//! import.

use super::AppState;
use crate::store::{AI_USERNAME_KEY, ANON_USERNAMES_KEY, HUMAN_USERNAME_KEY, MESSAGES_KEY};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema version for export format compatibility
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub human_username: Option<String>,
    #[serde(default)]
    pub ai_username: Option<String>,
    #[serde(default)]
    pub anon_usernames: Option<[Anon; 2]>,
}

impl SessionExport {
    pub fn new(
        turns: Vec<Turn>,
        human_username: Option<String>,
        ai_username: Option<String>,
        anon_usernames: Option<[Anon; 2]>,
    ) -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            turns,
            human_username,
            ai_username,
            anon_usernames,
        }
    }

    /// Validate the export before import
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Export schema version {} is newer than supported version {}. \
                 Please update the server.",
                self.schema_version, EXPORT_SCHEMA_VERSION
            ));
        }

        if let Some([a, b]) = &self.anon_usernames {
            if a == b {
                return Err(format!("Anon pool contains the same identifier twice: {}", a));
            }
        }

        for (idx, turn) in self.turns.iter().enumerate() {
            let Some(anon) = &turn.anon else {
                continue;
            };
            if turn.from == TurnOrigin::User {
                return Err(format!("Turn {} is a prompt but carries a pseudonym", idx));
            }
            if let Some(pool) = &self.anon_usernames {
                if !pool.contains(anon) {
                    return Err(format!(
                        "Turn {} uses pseudonym '{}' which is not in the anon pool",
                        idx, anon
                    ));
                }
            }
        }

        Ok(())
    }

    fn into_entries(self) -> Result<HashMap<String, String>, String> {
        let mut entries = HashMap::new();
        entries.insert(
            MESSAGES_KEY.to_string(),
            serde_json::to_string(&self.turns).map_err(|e| e.to_string())?,
        );
        if let Some(name) = self.human_username {
            entries.insert(HUMAN_USERNAME_KEY.to_string(), name);
        }
        if let Some(name) = self.ai_username {
            entries.insert(AI_USERNAME_KEY.to_string(), name);
        }
        if let Some(pool) = self.anon_usernames {
            entries.insert(
                ANON_USERNAMES_KEY.to_string(),
                serde_json::to_string(&pool).map_err(|e| e.to_string())?,
            );
        }
        Ok(entries)
    }
}

impl AppState {
    pub async fn export_state(&self) -> SessionExport {
        let anon_usernames = self
            .store
            .get_item(ANON_USERNAMES_KEY)
            .await
            .and_then(|raw| serde_json::from_str(&raw).ok());

        SessionExport::new(
            self.store.read().await,
            self.store.get_item(HUMAN_USERNAME_KEY).await,
            self.store.get_item(AI_USERNAME_KEY).await,
            anon_usernames,
        )
    }

    /// Replace the whole session with `export`
    pub async fn import_state(&self, export: SessionExport) -> Result<(), String> {
        export.validate()?;
        let turn_count = export.turns.len();
        let entries = export.into_entries()?;

        let mut cycle = self.cycle.write().await;
        cycle.epoch += 1;
        cycle.phase = CyclePhase::Idle;
        cycle.ai_reply = None;
        cycle.human_reply = None;
        self.store
            .replace_all(entries)
            .await
            .map_err(|e| e.to_string())?;
        tracing::info!("Imported session with {} turns", turn_count);

        let turns = self.store.read().await;
        self.resume_with_lock(&mut cycle, &turns);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameError;

    fn pool() -> [Anon; 2] {
        ["userAAAA".to_string(), "userBBBB".to_string()]
    }

    #[test]
    fn test_validation_future_schema() {
        let mut export = SessionExport::new(Vec::new(), None, None, None);
        export.schema_version = EXPORT_SCHEMA_VERSION + 1;

        let result = export.validate();
        assert!(result.unwrap_err().contains("newer than supported"));
    }

    #[test]
    fn test_validation_duplicate_pool() {
        let export = SessionExport::new(
            Vec::new(),
            None,
            None,
            Some(["userAAAA".to_string(), "userAAAA".to_string()]),
        );
        assert!(export.validate().unwrap_err().contains("same identifier"));
    }

    #[test]
    fn test_validation_unknown_pseudonym() {
        let export = SessionExport::new(
            vec![
                Turn::user("q"),
                Turn::revealed("x", TurnOrigin::Ai, "userZZZZ"),
            ],
            None,
            None,
            Some(pool()),
        );
        assert!(export.validate().unwrap_err().contains("not in the anon pool"));
    }

    #[tokio::test]
    async fn test_export_import_restores_session() {
        let source = AppState::new();
        source
            .store
            .write(&[
                Turn::user("q"),
                Turn::revealed("x", TurnOrigin::Ai, "userAAAA"),
                Turn::revealed("y", TurnOrigin::Human, "userBBBB"),
            ])
            .await
            .unwrap();
        source
            .store
            .set_item(ANON_USERNAMES_KEY, serde_json::to_string(&pool()).unwrap())
            .await
            .unwrap();
        source
            .store
            .set_item(HUMAN_USERNAME_KEY, "userHHHH".to_string())
            .await
            .unwrap();

        let export = source.export_state().await;
        let json = serde_json::to_string(&export).unwrap();
        let parsed: SessionExport = serde_json::from_str(&json).unwrap();

        let target = AppState::new();
        target.import_state(parsed).await.unwrap();

        assert_eq!(target.store.read().await, source.store.read().await);
        assert_eq!(target.usernames.anon_pool().await.unwrap(), pool());
        assert_eq!(
            target.store.get_item(HUMAN_USERNAME_KEY).await.as_deref(),
            Some("userHHHH")
        );
        assert_eq!(target.cycle_phase().await, CyclePhase::Idle);
    }

    #[tokio::test]
    async fn test_import_with_pending_prompt_resumes_cycle() {
        let state = AppState::new();
        let export = SessionExport::new(vec![Turn::user("still open")], None, None, None);

        let before = state.cycle.read().await.epoch;
        state.import_state(export).await.unwrap();
        assert_eq!(state.cycle_phase().await, CyclePhase::AwaitingBoth);
        // One bump for the import, one for the resumed cycle, nothing in between
        assert_eq!(state.cycle.read().await.epoch, before + 2);

        let result = state.submit_prompt("too early".to_string()).await;
        assert!(matches!(result, Err(GameError::PromptPending)));
        assert_eq!(state.store.read().await, vec![Turn::user("still open")]);
    }
}
