//! Polyvox - multilingual voice assistant for the terminal
//!
//! This library provides the pieces of the assistant pipeline:
//! - Voice processing (capture, endpointing, playback)
//! - STT and TTS provider clients
//! - Translation between the session language and the LLM pivot
//! - Ollama chat client
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Session loop                        │
//! │   text prompt  │  mic capture + endpointing          │
//! └────────────────────┬────────────────────────────────┘
//!                      │ utterance
//! ┌────────────────────▼────────────────────────────────┐
//! │   STT  →  translate to pivot  →  Ollama chat        │
//! │        →  translate back      →  TTS  →  playback   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod lang;
pub mod llm;
pub mod session;
pub mod setup;
pub mod stt;
pub mod translate;
pub mod tts;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use lang::{LANGUAGES, Language};
pub use llm::{ChatMessage, OllamaClient};
pub use session::{InputMode, Session};
pub use stt::SpeechToText;
pub use translate::Translator;
pub use tts::TextToSpeech;
