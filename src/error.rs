//! Error types for polyvox

use thiserror::Error;

/// Result type alias for polyvox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in polyvox
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Translation error
    #[error("translation error: {0}")]
    Translate(String),

    /// Language model error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Unknown language code
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
