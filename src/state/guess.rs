use super::AppState;
use crate::types::*;

/// The pair revealed after the latest user turn, if there is one to guess on
pub fn latest_pair(turns: &[Turn]) -> Option<ResponsePair> {
    let last_user = turns.iter().rposition(|t| t.from == TurnOrigin::User)?;

    let tagged: Vec<&Turn> = turns[last_user + 1..]
        .iter()
        .filter(|t| t.anon.is_some())
        .take(2)
        .collect();
    let [first, second] = tagged.as_slice() else {
        return None;
    };

    let which_is_human = [*first, *second]
        .into_iter()
        .find(|t| t.from == TurnOrigin::Human)
        .and_then(|t| t.anon.clone());
    let pair = ResponsePair {
        anons: [first.anon.clone()?, second.anon.clone()?],
        which_is_human,
    };
    Some(pair)
}

/// None when `anon` is not one of the pair's identifiers
pub fn resolve_guess(pair: &ResponsePair, anon: &str) -> Option<GuessOutcome> {
    if !pair.contains(anon) {
        return None;
    }

    Some(GuessOutcome {
        anon: anon.to_string(),
        correct: pair.which_is_human.as_deref() == Some(anon),
        human_anon: pair.which_is_human.clone(),
    })
}

impl AppState {
    pub async fn latest_pair(&self) -> Option<ResponsePair> {
        latest_pair(&self.store.read().await)
    }

    /// Check a guess against the latest pair. Does not touch the log.
    pub async fn guess(&self, anon: &str) -> Option<GuessOutcome> {
        let Some(pair) = self.latest_pair().await else {
            tracing::debug!("Guess for {} but no pair to guess on", anon);
            return None;
        };

        let outcome = resolve_guess(&pair, anon);
        match &outcome {
            Some(o) => tracing::info!("Guess {}: correct={}", o.anon, o.correct),
            None => tracing::debug!("Ignoring guess for unknown identifier {}", anon),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revealed_log() -> Vec<Turn> {
        vec![
            Turn::user("What is your favorite color?"),
            Turn::revealed("blue", TurnOrigin::Human, "userHUMN"),
            Turn::revealed("Blue.", TurnOrigin::Ai, "userROBO"),
        ]
    }

    #[test]
    fn test_no_pair_without_user_turn() {
        assert!(latest_pair(&[]).is_none());
        assert!(latest_pair(&[Turn::revealed("x", TurnOrigin::Ai, "userAAAA")]).is_none());
    }

    #[test]
    fn test_no_pair_with_fewer_than_two_tagged_turns() {
        assert!(latest_pair(&[Turn::user("q")]).is_none());
        assert!(latest_pair(&[Turn::user("q"), Turn::human("a", "userHHHH")]).is_none());
        assert!(latest_pair(&[
            Turn::user("q"),
            Turn::revealed("a", TurnOrigin::Ai, "userAAAA"),
        ])
        .is_none());
    }

    #[test]
    fn test_pair_only_counts_turns_after_latest_prompt() {
        let mut turns = revealed_log();
        turns.push(Turn::user("next question"));
        assert!(latest_pair(&turns).is_none());
    }

    #[test]
    fn test_latest_pair_reports_human() {
        let pair = latest_pair(&revealed_log()).unwrap();
        assert_eq!(pair.anons, ["userHUMN".to_string(), "userROBO".to_string()]);
        assert_eq!(pair.which_is_human.as_deref(), Some("userHUMN"));
    }

    #[test]
    fn test_latest_pair_finds_human_in_second_slot() {
        let turns = vec![
            Turn::user("q"),
            Turn::revealed("Blue.", TurnOrigin::Ai, "userROBO"),
            Turn::revealed("blue", TurnOrigin::Human, "userHUMN"),
        ];
        let pair = latest_pair(&turns).unwrap();
        assert_eq!(pair.anons, ["userROBO".to_string(), "userHUMN".to_string()]);
        assert_eq!(pair.which_is_human.as_deref(), Some("userHUMN"));
    }

    #[test]
    fn test_resolve_guess() {
        let pair = latest_pair(&revealed_log()).unwrap();

        let right = resolve_guess(&pair, "userHUMN").unwrap();
        assert!(right.correct);

        let wrong = resolve_guess(&pair, "userROBO").unwrap();
        assert!(!wrong.correct);
        assert_eq!(wrong.human_anon.as_deref(), Some("userHUMN"));

        assert!(resolve_guess(&pair, "userNOPE").is_none());
    }

    #[tokio::test]
    async fn test_guess_does_not_mutate_log() {
        let state = AppState::new();
        state.store.write(&revealed_log()).await.unwrap();

        assert!(state.guess("userHUMN").await.unwrap().correct);
        assert!(state.guess("userZZZZ").await.is_none());
        assert_eq!(state.store.read().await, revealed_log());
    }

    #[tokio::test]
    async fn test_guess_without_pair_is_noop() {
        let state = AppState::new();
        assert!(state.guess("userHUMN").await.is_none());
    }
}
