//! Turn-by-turn dialogue for one call.
//!
//! ```text
//! Greeting -> Speaking -> Playing -> Listening -> Deciding -> Speaking ...
//!                                        |            |-> Transferring -> Ended
//!                                        |            `-> Ended (hangup)
//!                                        `-> Ended (timeout)
//! ```
//!
//! Each step performs at most one external side effect before returning the
//! next state, so a call can be observed or driven one transition at a time
//! through [`TurnController::step`].

use crate::control::{CallControl, DialplanTarget};
use crate::listen::UtteranceSource;
use crate::playback::{PlaybackSignals, PlaybackWait};
use crate::registry::SessionRegistry;
use dsva_types::{ConversationTurn, IntentClassifier, APOLOGY, GREETING};
use dsva_voice::{AudioArtifact, ResponseGenerator, SpeechSynthesizer};
use dsva_webhook::WebhookDispatcher;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Behavioural knobs for the call flow.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub greeting: String,
    pub apology: String,
    /// Case-insensitive substrings of the caller's utterance that end the call.
    pub termination_keywords: Vec<String>,
    pub transfer_target: DialplanTarget,
    /// Upper bound for one playback-completion wait.
    pub playback_timeout: Duration,
    /// Consecutive silent listen attempts before the call is ended.
    pub listen_attempts: u32,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            greeting: GREETING.to_string(),
            apology: APOLOGY.to_string(),
            termination_keywords: vec!["hangup".to_string()],
            transfer_target: DialplanTarget::default(),
            playback_timeout: Duration::from_secs(30),
            listen_attempts: 3,
        }
    }
}

/// Collaborators shared by every call.
#[derive(Clone)]
pub struct CallDeps {
    pub generator: Arc<dyn ResponseGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub control: Arc<dyn CallControl>,
    pub listener: Arc<dyn UtteranceSource>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub signals: Arc<PlaybackSignals>,
    pub registry: Arc<SessionRegistry>,
    /// Receives loggable interactions. `None` disables reporting.
    pub dispatcher: Option<Arc<WebhookDispatcher>>,
}

/// Why a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The caller said a termination keyword.
    Hangup,
    /// The call was redirected to a human.
    Transferred,
    /// Nothing was heard within the allowed listen attempts.
    Timeout,
    /// The call went away underneath the controller.
    CallerLeft,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hangup => "hangup",
            Self::Transferred => "transferred",
            Self::Timeout => "timeout",
            Self::CallerLeft => "caller_left",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallState {
    Greeting,
    /// Synthesizing the pending assistant utterance.
    Speaking { utterance: String },
    /// Playing synthesized audio and waiting for it to finish.
    Playing {
        utterance: String,
        artifact: AudioArtifact,
    },
    /// Waiting for the caller. `attempt` starts at 1.
    Listening { utterance: String, attempt: u32 },
    /// `utterance` is the assistant turn the caller just answered.
    Deciding { utterance: String, caller: String },
    Transferring,
    Ended(EndReason),
}

impl CallState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Speaking { .. } => "speaking",
            Self::Playing { .. } => "playing",
            Self::Listening { .. } => "listening",
            Self::Deciding { .. } => "deciding",
            Self::Transferring => "transferring",
            Self::Ended(_) => "ended",
        }
    }
}

/// Drives one call's state machine. The session itself lives in the
/// [`SessionRegistry`]; the controller only holds the call id.
pub struct TurnController {
    call_id: String,
    deps: CallDeps,
    settings: Arc<TurnSettings>,
}

impl TurnController {
    pub fn new(call_id: impl Into<String>, deps: CallDeps, settings: Arc<TurnSettings>) -> Self {
        Self {
            call_id: call_id.into(),
            deps,
            settings,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Runs the call from greeting to its end and releases the session.
    pub async fn run(&self) -> EndReason {
        let mut state = CallState::Greeting;
        loop {
            let next = self.step(state).await;
            tracing::debug!(call_id = %self.call_id, state = next.name(), "call state transition");
            if let CallState::Ended(reason) = next {
                self.finish(reason).await;
                return reason;
            }
            state = next;
        }
    }

    /// Performs one transition.
    pub async fn step(&self, state: CallState) -> CallState {
        match state {
            CallState::Greeting => CallState::Speaking {
                utterance: self.settings.greeting.clone(),
            },
            CallState::Speaking { utterance } => self.speak(utterance).await,
            CallState::Playing {
                utterance,
                artifact,
            } => self.play(utterance, artifact).await,
            CallState::Listening { utterance, attempt } => self.listen(utterance, attempt).await,
            CallState::Deciding { utterance, caller } => self.decide(utterance, caller).await,
            CallState::Transferring => self.transfer().await,
            ended @ CallState::Ended(_) => ended,
        }
    }

    async fn speak(&self, utterance: String) -> CallState {
        tracing::info!(call_id = %self.call_id, text = %utterance, "agent utterance");
        let name_hint = format!("response_{}_{}", self.call_id, uuid::Uuid::new_v4().simple());

        match self.deps.synthesizer.synthesize(&utterance, &name_hint).await {
            Ok(artifact) => CallState::Playing {
                utterance,
                artifact,
            },
            Err(e) => {
                tracing::warn!(
                    call_id = %self.call_id,
                    "speech synthesis failed, continuing without audio: {}",
                    e
                );
                CallState::Listening {
                    utterance,
                    attempt: 1,
                }
            }
        }
    }

    async fn play(&self, utterance: String, artifact: AudioArtifact) -> CallState {
        let waiter = self.deps.signals.expect(&self.call_id);
        match self.deps.control.play(&self.call_id, &artifact.media_uri).await {
            Ok(playback_id) => self.deps.signals.bind(&self.call_id, &playback_id),
            Err(e) => {
                self.deps.signals.abandon(&self.call_id);
                tracing::warn!(call_id = %self.call_id, "failed to start playback: {}", e);
                discard(&artifact).await;
                return CallState::Listening {
                    utterance,
                    attempt: 1,
                };
            }
        }

        match PlaybackSignals::wait(waiter, self.settings.playback_timeout).await {
            PlaybackWait::Finished => {}
            PlaybackWait::TimedOut => {
                self.deps.signals.abandon(&self.call_id);
                tracing::warn!(
                    call_id = %self.call_id,
                    timeout_secs = self.settings.playback_timeout.as_secs(),
                    "no playback-finished event before timeout"
                );
            }
            PlaybackWait::Cancelled => {
                discard(&artifact).await;
                return CallState::Ended(EndReason::CallerLeft);
            }
        }

        discard(&artifact).await;
        CallState::Listening {
            utterance,
            attempt: 1,
        }
    }

    async fn listen(&self, utterance: String, attempt: u32) -> CallState {
        let heard = match self.deps.listener.listen(&self.call_id).await {
            Ok(heard) => heard.filter(|text| !text.trim().is_empty()),
            Err(e) => {
                tracing::warn!(call_id = %self.call_id, attempt, "listening failed: {}", e);
                None
            }
        };

        match heard {
            Some(caller) => {
                tracing::info!(call_id = %self.call_id, text = %caller, "caller utterance");
                CallState::Deciding { utterance, caller }
            }
            None if attempt >= self.settings.listen_attempts => {
                tracing::info!(call_id = %self.call_id, attempts = attempt, "caller silent, ending call");
                CallState::Ended(EndReason::Timeout)
            }
            None => CallState::Listening {
                utterance,
                attempt: attempt + 1,
            },
        }
    }

    async fn decide(&self, utterance: String, caller: String) -> CallState {
        let recorded = self.deps.registry.append(
            &self.call_id,
            [
                ConversationTurn::assistant(utterance),
                ConversationTurn::user(caller.clone()),
            ],
        );
        if !recorded {
            return CallState::Ended(EndReason::CallerLeft);
        }

        if self.is_termination(&caller) {
            tracing::info!(call_id = %self.call_id, "caller asked to hang up");
            if let Err(e) = self.deps.control.hangup(&self.call_id).await {
                tracing::warn!(call_id = %self.call_id, "failed to hang up: {}", e);
            }
            return CallState::Ended(EndReason::Hangup);
        }

        let history = self
            .deps
            .registry
            .history(&self.call_id)
            .unwrap_or_default();
        let reply = match self.deps.generator.generate(&history).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(call_id = %self.call_id, "response generation failed: {}", e);
                self.settings.apology.clone()
            }
        };

        let decision = self.deps.classifier.classify(&reply);
        if decision.loggable {
            self.report(caller, reply.clone());
        }

        if decision.transfer {
            CallState::Transferring
        } else {
            CallState::Speaking { utterance: reply }
        }
    }

    async fn transfer(&self) -> CallState {
        let target = &self.settings.transfer_target;
        tracing::info!(
            call_id = %self.call_id,
            context = %target.context,
            extension = %target.extension,
            "transferring call"
        );
        if let Err(e) = self.deps.control.redirect(&self.call_id, target).await {
            tracing::error!(call_id = %self.call_id, "failed to transfer call: {}", e);
        }
        CallState::Ended(EndReason::Transferred)
    }

    async fn finish(&self, reason: EndReason) {
        if reason == EndReason::Timeout {
            if let Err(e) = self.deps.control.hangup(&self.call_id).await {
                tracing::warn!(call_id = %self.call_id, "failed to hang up: {}", e);
            }
        }
        self.deps.signals.cancel(&self.call_id);
        self.deps.registry.release(&self.call_id);
        tracing::info!(call_id = %self.call_id, reason = reason.as_str(), "call ended");
    }

    fn is_termination(&self, caller: &str) -> bool {
        let caller = caller.to_lowercase();
        self.settings
            .termination_keywords
            .iter()
            .any(|keyword| caller.contains(&keyword.to_lowercase()))
    }

    /// Hands the interaction to the webhook on a detached task.
    fn report(&self, caller: String, reply: String) {
        let Some(dispatcher) = self.deps.dispatcher.clone() else {
            return;
        };
        let mut extra = Map::new();
        extra.insert("callId".to_string(), Value::String(self.call_id.clone()));

        tokio::spawn(async move {
            dispatcher
                .notify_interaction("telephony", &caller, &reply, extra)
                .await;
        });
    }
}

/// Removes a synthesized file once the platform no longer needs it.
async fn discard(artifact: &AudioArtifact) {
    if let Err(e) = tokio::fs::remove_file(&artifact.path).await {
        tracing::debug!(path = %artifact.path.display(), "could not remove audio file: {}", e);
    }
}
