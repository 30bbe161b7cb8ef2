//! TOML configuration file loading
//!
//! Supports `~/.config/polyvox/config.toml` as a persistent config
//! source. All fields are optional — the file is a partial overlay on
//! top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct PolyvoxConfigFile {
    /// Default session language code (e.g. "de")
    #[serde(default)]
    pub language: Option<String>,

    /// Conversation turns kept in the LLM context window
    #[serde(default)]
    pub history_turns: Option<usize>,

    /// Write session transcripts under the data directory
    #[serde(default)]
    pub transcripts: Option<bool>,

    /// LLM configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Translation configuration
    #[serde(default)]
    pub translation: TranslationFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Ollama daemon URL (e.g. "http://localhost:11434")
    pub url: Option<String>,

    /// Model identifier (e.g. "llama3")
    pub model: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice input/output
    pub enabled: Option<bool>,

    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// Hard cap on a single voice utterance, in seconds
    pub max_utterance_secs: Option<u64>,
}

/// Translation configuration
#[derive(Debug, Default, Deserialize)]
pub struct TranslationFileConfig {
    /// Provider ("deepl" or "libretranslate")
    pub provider: Option<String>,

    /// LibreTranslate endpoint URL
    pub endpoint: Option<String>,

    /// Pivot language the LLM operates in
    pub pivot: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
    pub deepl: Option<String>,
    pub libretranslate: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `PolyvoxConfigFile::default()` if the file doesn't exist or
/// can't be parsed.
pub fn load_config_file() -> PolyvoxConfigFile {
    let Some(path) = config_file_path() else {
        return PolyvoxConfigFile::default();
    };

    if !path.exists() {
        return PolyvoxConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_config_file(&content, &path),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            PolyvoxConfigFile::default()
        }
    }
}

/// Parse config file content, falling back to defaults on error
fn parse_config_file(content: &str, path: &std::path::Path) -> PolyvoxConfigFile {
    match toml::from_str(content) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse config file, using defaults"
            );
            PolyvoxConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/polyvox/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("polyvox").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_file_parses() {
        let toml = r#"
            language = "de"
            history_turns = 12
            transcripts = true

            [llm]
            url = "http://localhost:11434"
            model = "llama3"

            [voice]
            enabled = true
            stt_provider = "deepgram"
            stt_model = "nova-2"
            tts_provider = "elevenlabs"
            tts_voice = "some-voice-id"
            max_utterance_secs = 8

            [translation]
            provider = "libretranslate"
            endpoint = "http://localhost:5000/translate"
            pivot = "en"

            [api_keys]
            deepgram = "dg-key"
            elevenlabs = "el-key"
        "#;

        let parsed: PolyvoxConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(parsed.language.as_deref(), Some("de"));
        assert_eq!(parsed.history_turns, Some(12));
        assert_eq!(parsed.llm.model.as_deref(), Some("llama3"));
        assert_eq!(parsed.voice.stt_provider.as_deref(), Some("deepgram"));
        assert_eq!(parsed.voice.max_utterance_secs, Some(8));
        assert_eq!(
            parsed.translation.endpoint.as_deref(),
            Some("http://localhost:5000/translate")
        );
        assert_eq!(parsed.api_keys.deepgram.as_deref(), Some("dg-key"));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let parsed: PolyvoxConfigFile = toml::from_str("").unwrap();
        assert!(parsed.language.is_none());
        assert!(parsed.llm.model.is_none());
        assert!(parsed.voice.enabled.is_none());
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let path = std::path::Path::new("bad.toml");
        let parsed = parse_config_file("language = [not toml", path);
        assert!(parsed.language.is_none());
    }
}
