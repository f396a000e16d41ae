//! Classification of generated replies into agent decisions.
//!
//! The model signals intent through plain text: an exact sentinel for a
//! transfer and a confirmation phrase for a captured request. Callers depend
//! only on [`IntentClassifier`], so the matching rule can be replaced by
//! structured model output without touching the turn logic.

use crate::{LOGGED_REQUEST_PHRASE, TRANSFER_SENTINEL};

/// What the agent should do with a generated reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentDecision {
    /// The reply asks for the call to be handed to a human.
    pub transfer: bool,
    /// The reply should be reported to the webhook.
    pub loggable: bool,
}

impl AgentDecision {
    /// A plain conversational reply.
    pub fn normal_reply() -> Self {
        Self::default()
    }
}

pub trait IntentClassifier: Send + Sync {
    fn classify(&self, reply: &str) -> AgentDecision;
}

/// Literal phrase matching.
///
/// - `transfer` iff the trimmed reply equals the sentinel.
/// - `loggable` iff the reply contains the logged-request phrase or the sentinel.
#[derive(Debug, Clone)]
pub struct PhraseClassifier {
    transfer_sentinel: String,
    logged_phrase: String,
}

impl PhraseClassifier {
    pub fn new(transfer_sentinel: impl Into<String>, logged_phrase: impl Into<String>) -> Self {
        Self {
            transfer_sentinel: transfer_sentinel.into(),
            logged_phrase: logged_phrase.into(),
        }
    }

    pub fn transfer_sentinel(&self) -> &str {
        &self.transfer_sentinel
    }
}

impl Default for PhraseClassifier {
    fn default() -> Self {
        Self::new(TRANSFER_SENTINEL, LOGGED_REQUEST_PHRASE)
    }
}

impl IntentClassifier for PhraseClassifier {
    fn classify(&self, reply: &str) -> AgentDecision {
        let transfer = reply.trim() == self.transfer_sentinel;
        let loggable =
            reply.contains(&self.logged_phrase) || reply.contains(&self.transfer_sentinel);
        AgentDecision { transfer, loggable }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_transfer_and_loggable() {
        let decision = PhraseClassifier::default().classify("transfer_to_owner");
        assert_eq!(
            decision,
            AgentDecision {
                transfer: true,
                loggable: true
            }
        );
    }

    #[test]
    fn embedded_sentinel_is_loggable_but_not_transfer() {
        let decision =
            PhraseClassifier::default().classify("Sure, transfer_to_owner coming up");
        assert!(!decision.transfer);
        assert!(decision.loggable);
    }

    #[test]
    fn logged_request_phrase_is_loggable() {
        let decision = PhraseClassifier::default().classify(
            "Understood. I have logged your request for a consultation on Tuesday.",
        );
        assert!(!decision.transfer);
        assert!(decision.loggable);
    }

    #[test]
    fn plain_reply_is_neither() {
        let decision = PhraseClassifier::default().classify("How can I help?");
        assert_eq!(decision, AgentDecision::normal_reply());
    }

    #[test]
    fn phrase_match_is_case_sensitive() {
        let decision = PhraseClassifier::default().classify("I have LOGGED YOUR REQUEST");
        assert!(!decision.loggable);
    }
}
