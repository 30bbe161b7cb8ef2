//! Configuration management for polyvox

pub mod file;

use std::path::PathBuf;

use crate::llm::DEFAULT_OLLAMA_URL;
use crate::{Error, Result, lang};

/// Polyvox configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Default session language code
    pub language: String,

    /// Whether the language was chosen via CLI flag, env var, or config file
    ///
    /// When false, the session prompts for a language at startup.
    pub language_explicit: bool,

    /// Conversation turns kept in the LLM context window
    pub history_turns: usize,

    /// Write session transcripts under the data directory
    pub transcripts: bool,

    /// Path to data directory (transcripts)
    pub data_dir: PathBuf,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// LLM configuration
    pub llm: LlmConfig,

    /// Translation configuration
    pub translation: TranslationConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice input/output
    pub enabled: bool,

    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: String,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: String,

    /// TTS model (e.g. "tts-1", "eleven_multilingual_v2")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// Hard cap on a single voice utterance, in seconds
    pub max_utterance_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_provider: "whisper".to_string(),
            stt_model: "whisper-1".to_string(),
            tts_provider: "openai".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            max_utterance_secs: 10,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Ollama daemon URL
    pub url: String,

    /// Preselected model; `None` prompts a menu at session start
    pub model: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: None,
        }
    }
}

/// Translation configuration
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    /// Provider ("deepl" or "libretranslate")
    pub provider: String,

    /// LibreTranslate endpoint URL
    pub endpoint: Option<String>,

    /// Pivot language the LLM operates in
    pub pivot: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: "deepl".to_string(),
            endpoint: None,
            pivot: "en".to_string(),
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper STT and TTS)
    pub openai: Option<String>,

    /// Deepgram API key (optional STT)
    pub deepgram: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,

    /// DeepL API key (translation)
    pub deepl: Option<String>,

    /// LibreTranslate API key (optional, for hosted instances)
    pub libretranslate: Option<String>,
}

/// Return the data directory for transcripts, creating it if needed
///
/// Uses `~/.local/share/polyvox/` on Linux
pub fn data_dir() -> PathBuf {
    let dir = directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/polyvox"),
        |d| d.data_dir().join("polyvox"),
    );

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(
            path = %dir.display(),
            error = %e,
            "failed to create data directory"
        );
    }

    dir
}

impl Config {
    /// Load configuration, layering env vars over the TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the configured language code is unknown
    pub fn load() -> Result<Self> {
        Self::load_with_options(None, false)
    }

    /// Load configuration with CLI overrides
    ///
    /// # Errors
    ///
    /// Returns error if the configured language code is unknown
    pub fn load_with_options(language: Option<&str>, disable_voice: bool) -> Result<Self> {
        let fc = file::load_config_file();

        // Load API keys (env > toml > None)
        let api_keys = ApiKeys {
            openai: std::env::var("OPENAI_API_KEY").ok().or(fc.api_keys.openai),
            deepgram: std::env::var("DEEPGRAM_API_KEY")
                .ok()
                .or(fc.api_keys.deepgram),
            elevenlabs: std::env::var("ELEVENLABS_API_KEY")
                .ok()
                .or(fc.api_keys.elevenlabs),
            deepl: std::env::var("DEEPL_API_KEY").ok().or(fc.api_keys.deepl),
            libretranslate: std::env::var("LIBRETRANSLATE_API_KEY")
                .ok()
                .or(fc.api_keys.libretranslate),
        };

        let language = language
            .map(str::to_string)
            .or_else(|| std::env::var("POLYVOX_LANGUAGE").ok())
            .or(fc.language);
        let language_explicit = language.is_some();
        let language = language.unwrap_or_else(|| "en".to_string());

        // Reject unknown codes at load time, not mid-session
        lang::by_code(&language)?;

        let voice_defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            enabled: !disable_voice && fc.voice.enabled.unwrap_or(voice_defaults.enabled),
            stt_provider: fc
                .voice
                .stt_provider
                .unwrap_or(voice_defaults.stt_provider),
            stt_model: fc.voice.stt_model.unwrap_or(voice_defaults.stt_model),
            tts_provider: fc
                .voice
                .tts_provider
                .unwrap_or(voice_defaults.tts_provider),
            tts_model: fc.voice.tts_model.unwrap_or(voice_defaults.tts_model),
            tts_voice: fc.voice.tts_voice.unwrap_or(voice_defaults.tts_voice),
            tts_speed: fc.voice.tts_speed.unwrap_or(voice_defaults.tts_speed),
            max_utterance_secs: fc
                .voice
                .max_utterance_secs
                .unwrap_or(voice_defaults.max_utterance_secs),
        };

        let llm_defaults = LlmConfig::default();
        let llm = LlmConfig {
            url: std::env::var("OLLAMA_URL")
                .ok()
                .or(fc.llm.url)
                .unwrap_or(llm_defaults.url),
            model: fc.llm.model,
        };

        let translation_defaults = TranslationConfig::default();
        let translation = TranslationConfig {
            provider: fc
                .translation
                .provider
                .unwrap_or(translation_defaults.provider),
            endpoint: std::env::var("LIBRETRANSLATE_URL")
                .ok()
                .or(fc.translation.endpoint),
            pivot: fc.translation.pivot.unwrap_or(translation_defaults.pivot),
        };

        Ok(Self {
            language,
            language_explicit,
            history_turns: fc.history_turns.unwrap_or(20),
            transcripts: fc.transcripts.unwrap_or(true),
            data_dir: data_dir(),
            voice,
            llm,
            translation,
            api_keys,
        })
    }

    /// Build the STT client for the configured provider
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unknown or its key is missing
    pub fn build_stt(&self) -> Result<crate::stt::SpeechToText> {
        match self.voice.stt_provider.as_str() {
            "whisper" => crate::stt::SpeechToText::new_whisper(
                self.api_keys.openai.clone().unwrap_or_default(),
                self.voice.stt_model.clone(),
            ),
            "deepgram" => crate::stt::SpeechToText::new_deepgram(
                self.api_keys.deepgram.clone().unwrap_or_default(),
                self.voice.stt_model.clone(),
            ),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }

    /// Build the TTS client for the configured provider
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unknown or its key is missing
    pub fn build_tts(&self) -> Result<crate::tts::TextToSpeech> {
        match self.voice.tts_provider.as_str() {
            "openai" => crate::tts::TextToSpeech::new_openai(
                self.api_keys.openai.clone().unwrap_or_default(),
                self.voice.tts_voice.clone(),
                self.voice.tts_speed,
                self.voice.tts_model.clone(),
            ),
            "elevenlabs" => crate::tts::TextToSpeech::new_elevenlabs(
                self.api_keys.elevenlabs.clone().unwrap_or_default(),
                self.voice.tts_voice.clone(),
                self.voice.tts_model.clone(),
            ),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }

    /// Build the translator for the configured provider
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unknown or misconfigured
    pub fn build_translator(&self) -> Result<crate::translate::Translator> {
        match self.translation.provider.as_str() {
            "deepl" => crate::translate::Translator::new_deepl(
                self.api_keys.deepl.clone().unwrap_or_default(),
                self.translation.pivot.clone(),
            ),
            "libretranslate" => crate::translate::Translator::new_libretranslate(
                self.translation.endpoint.clone().unwrap_or_default(),
                self.api_keys.libretranslate.clone().unwrap_or_default(),
                self.translation.pivot.clone(),
            ),
            other => Err(Error::Config(format!(
                "unknown translation provider: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_defaults_are_sane() {
        let voice = VoiceConfig::default();
        assert!(voice.enabled);
        assert_eq!(voice.stt_provider, "whisper");
        assert_eq!(voice.tts_provider, "openai");
        assert_eq!(voice.max_utterance_secs, 10);
    }

    #[test]
    fn cli_language_is_marked_explicit() {
        let config = Config::load_with_options(Some("de"), true).unwrap();
        assert_eq!(config.language, "de");
        assert!(config.language_explicit);
    }

    #[test]
    fn unknown_stt_provider_is_rejected() {
        let mut config = test_config();
        config.voice.stt_provider = "kaldi".to_string();
        assert!(matches!(config.build_stt(), Err(Error::Config(_))));
    }

    #[test]
    fn unknown_translation_provider_is_rejected() {
        let mut config = test_config();
        config.translation.provider = "babelfish".to_string();
        assert!(matches!(config.build_translator(), Err(Error::Config(_))));
    }

    #[test]
    fn build_stt_uses_configured_provider() {
        let mut config = test_config();
        config.api_keys.deepgram = Some("dg-key".to_string());
        config.voice.stt_provider = "deepgram".to_string();
        assert!(config.build_stt().is_ok());
    }

    fn test_config() -> Config {
        Config {
            language: "en".to_string(),
            language_explicit: true,
            history_turns: 20,
            transcripts: false,
            data_dir: std::env::temp_dir(),
            voice: VoiceConfig::default(),
            llm: LlmConfig::default(),
            translation: TranslationConfig::default(),
            api_keys: ApiKeys::default(),
        }
    }
}
