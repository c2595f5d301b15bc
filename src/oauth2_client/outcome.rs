// ABOUTME: Per-user record of the most recent lifecycle outcome
// ABOUTME: Feeds connection state derivation so a terminal loss stays visible until the user reconnects

use dashmap::DashMap;

use vitalsync_core::models::LastOutcome;

/// Last outcome per user; absent means [`LastOutcome::Ok`]
#[derive(Debug, Default)]
pub struct OutcomeLedger {
    outcomes: DashMap<String, LastOutcome>,
}

impl OutcomeLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `outcome` for `user_id`
    pub fn record(&self, user_id: &str, outcome: LastOutcome) {
        if outcome == LastOutcome::Ok {
            self.outcomes.remove(user_id);
        } else {
            self.outcomes.insert(user_id.to_owned(), outcome);
        }
    }

    /// Most recent outcome for `user_id`
    #[must_use]
    pub fn last(&self, user_id: &str) -> LastOutcome {
        self.outcomes
            .get(user_id)
            .map_or(LastOutcome::Ok, |entry| *entry.value())
    }
}
