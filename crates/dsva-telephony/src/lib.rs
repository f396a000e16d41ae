//! Telephony side of the voice agent.
//!
//! A [`CallRouter`] receives [`CallEvent`]s from the platform (Asterisk ARI
//! via [`AriEventStream`]), opens a session per call in the
//! [`SessionRegistry`] and runs a [`TurnController`] for it. The controller
//! talks to the platform only through [`CallControl`] and hears the caller
//! through an [`UtteranceSource`], so both can be replaced in tests.

pub mod ari;
pub mod control;
pub mod controller;
pub mod error;
pub mod listen;
pub mod playback;
pub mod registry;
pub mod router;

pub use ari::{parse_event, AriClient, AriConfig, AriEventStream};
pub use control::{CallControl, CallEvent, DialplanTarget};
pub use controller::{CallDeps, CallState, EndReason, TurnController, TurnSettings};
pub use error::TelephonyError;
pub use listen::{SilentListener, UtteranceSource};
pub use playback::{PlaybackSignals, PlaybackWait};
pub use registry::{CallSession, CallSummary, SessionRegistry};
pub use router::CallRouter;
