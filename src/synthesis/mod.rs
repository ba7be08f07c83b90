//! Speech synthesis dispatch
//!
//! Picks between the loaded model and the placeholder tone and writes the
//! result as a WAV file the HTTP layer can stream back.

mod dispatcher;

pub use dispatcher::{SpeechDispatcher, SynthesisBackend, SynthesisMode, SynthesisOutcome};
