//! Interactive first-run setup wizard (`polyvox setup`)

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};

use crate::config::file::{
    ApiKeysFileConfig, LlmFileConfig, PolyvoxConfigFile, TranslationFileConfig, VoiceFileConfig,
};
use crate::lang::LANGUAGES;

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Polyvox Setup\n");

    // Load existing config if present
    let existing = crate::config::file::load_config_file();
    let config_path = crate::config::file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/polyvox/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. Session language
    let default_language = existing
        .language
        .as_deref()
        .and_then(|code| LANGUAGES.iter().position(|l| l.code == code))
        .unwrap_or(0);

    let language_idx = Select::new()
        .with_prompt("Default session language")
        .items(LANGUAGES)
        .default(default_language)
        .interact()?;
    let language = LANGUAGES[language_idx].code.to_string();

    // 2. Ollama daemon
    let ollama_url: String = Input::new()
        .with_prompt("Ollama URL")
        .default(
            existing
                .llm
                .url
                .unwrap_or_else(|| crate::llm::DEFAULT_OLLAMA_URL.to_string()),
        )
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Default model (leave blank to pick at startup)")
        .default(existing.llm.model.unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    let mut api_keys = ApiKeysFileConfig {
        openai: existing.api_keys.openai,
        deepgram: existing.api_keys.deepgram,
        elevenlabs: existing.api_keys.elevenlabs,
        deepl: existing.api_keys.deepl,
        libretranslate: existing.api_keys.libretranslate,
    };

    // 3. Voice (optional)
    let voice_default = existing.voice.enabled.unwrap_or(true);
    let enable_voice = Confirm::new()
        .with_prompt("Enable voice (STT/TTS)?")
        .default(voice_default)
        .interact()?;

    let voice = if enable_voice {
        let stt_providers = ["whisper", "deepgram"];
        let stt_default = existing
            .voice
            .stt_provider
            .as_deref()
            .and_then(|p| stt_providers.iter().position(|&s| s == p))
            .unwrap_or(0);
        let stt_idx = Select::new()
            .with_prompt("STT provider")
            .items(&stt_providers)
            .default(stt_default)
            .interact()?;
        let stt_provider = stt_providers[stt_idx].to_string();

        let tts_providers = ["openai", "elevenlabs"];
        let tts_default = existing
            .voice
            .tts_provider
            .as_deref()
            .and_then(|p| tts_providers.iter().position(|&s| s == p))
            .unwrap_or(0);
        let tts_idx = Select::new()
            .with_prompt("TTS provider")
            .items(&tts_providers)
            .default(tts_default)
            .interact()?;
        let tts_provider = tts_providers[tts_idx].to_string();

        // Collect keys for the chosen providers
        if stt_provider == "whisper" || tts_provider == "openai" {
            api_keys.openai = prompt_key("OpenAI API key", api_keys.openai.as_deref())?;
        }
        if stt_provider == "deepgram" {
            api_keys.deepgram = prompt_key("Deepgram API key", api_keys.deepgram.as_deref())?;
        }
        if tts_provider == "elevenlabs" {
            api_keys.elevenlabs =
                prompt_key("ElevenLabs API key", api_keys.elevenlabs.as_deref())?;
        }

        VoiceFileConfig {
            enabled: Some(true),
            stt_provider: Some(stt_provider),
            stt_model: existing.voice.stt_model,
            tts_provider: Some(tts_provider),
            tts_model: existing.voice.tts_model,
            tts_voice: existing.voice.tts_voice,
            tts_speed: existing.voice.tts_speed,
            max_utterance_secs: existing.voice.max_utterance_secs,
        }
    } else {
        VoiceFileConfig {
            enabled: Some(false),
            ..VoiceFileConfig::default()
        }
    };

    // 4. Translation provider
    let providers = ["deepl", "libretranslate"];
    let default_provider = existing
        .translation
        .provider
        .as_deref()
        .and_then(|p| providers.iter().position(|&l| l == p))
        .unwrap_or(0);

    let provider_idx = Select::new()
        .with_prompt("Translation provider")
        .items(&providers)
        .default(default_provider)
        .interact()?;
    let provider = providers[provider_idx].to_string();

    let endpoint = if provider == "libretranslate" {
        let endpoint: String = Input::new()
            .with_prompt("LibreTranslate endpoint")
            .default(
                existing
                    .translation
                    .endpoint
                    .unwrap_or_else(|| "http://localhost:5000/translate".to_string()),
            )
            .interact_text()?;
        Some(endpoint)
    } else {
        api_keys.deepl = prompt_key("DeepL API key", api_keys.deepl.as_deref())?;
        existing.translation.endpoint
    };

    // 5. Build and write config
    let config_file = PolyvoxConfigFile {
        language: Some(language),
        history_turns: existing.history_turns,
        transcripts: existing.transcripts,
        llm: LlmFileConfig {
            url: Some(ollama_url),
            model: if model.is_empty() { None } else { Some(model) },
        },
        voice,
        translation: TranslationFileConfig {
            provider: Some(provider),
            endpoint,
            pivot: existing.translation.pivot,
        },
        api_keys,
    };

    write_config(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `polyvox -v` to start.");

    Ok(())
}

/// Prompt for an API key, masking and keeping any stored value
fn prompt_key(label: &str, existing: Option<&str>) -> anyhow::Result<Option<String>> {
    let masked = existing.map(mask_key);

    let prompt = if let Some(ref m) = masked {
        format!("{label} (current: {m}, leave blank to keep)")
    } else {
        label.to_string()
    };

    let input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    Ok(if input.is_empty() {
        existing.map(str::to_string)
    } else {
        Some(input)
    })
}

/// Show the first and last few characters of a stored key
///
/// Slices on character boundaries, not bytes, so keys containing
/// multi-byte characters do not panic.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Serialize and write the config file
fn write_config(path: &PathBuf, config: &PolyvoxConfigFile) -> anyhow::Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml = serialize_config(config);
    std::fs::write(path, toml)?;

    Ok(())
}

/// Serialize config to a readable TOML string
fn serialize_config(config: &PolyvoxConfigFile) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();

    if let Some(ref language) = config.language {
        let _ = writeln!(out, "language = \"{language}\"");
    }
    if let Some(turns) = config.history_turns {
        let _ = writeln!(out, "history_turns = {turns}");
    }
    if let Some(transcripts) = config.transcripts {
        let _ = writeln!(out, "transcripts = {transcripts}");
    }
    out.push('\n');

    // [llm]
    if config.llm.url.is_some() || config.llm.model.is_some() {
        out.push_str("[llm]\n");
        if let Some(ref url) = config.llm.url {
            let _ = writeln!(out, "url = \"{url}\"");
        }
        if let Some(ref model) = config.llm.model {
            let _ = writeln!(out, "model = \"{model}\"");
        }
        out.push('\n');
    }

    // [voice]
    if config.voice.enabled.is_some() {
        out.push_str("[voice]\n");
        if let Some(enabled) = config.voice.enabled {
            let _ = writeln!(out, "enabled = {enabled}");
        }
        if let Some(ref p) = config.voice.stt_provider {
            let _ = writeln!(out, "stt_provider = \"{p}\"");
        }
        if let Some(ref m) = config.voice.stt_model {
            let _ = writeln!(out, "stt_model = \"{m}\"");
        }
        if let Some(ref p) = config.voice.tts_provider {
            let _ = writeln!(out, "tts_provider = \"{p}\"");
        }
        if let Some(ref m) = config.voice.tts_model {
            let _ = writeln!(out, "tts_model = \"{m}\"");
        }
        if let Some(ref v) = config.voice.tts_voice {
            let _ = writeln!(out, "tts_voice = \"{v}\"");
        }
        if let Some(s) = config.voice.tts_speed {
            let _ = writeln!(out, "tts_speed = {s}");
        }
        if let Some(s) = config.voice.max_utterance_secs {
            let _ = writeln!(out, "max_utterance_secs = {s}");
        }
        out.push('\n');
    }

    // [translation]
    let tr = &config.translation;
    if tr.provider.is_some() || tr.endpoint.is_some() || tr.pivot.is_some() {
        out.push_str("[translation]\n");
        if let Some(ref p) = tr.provider {
            let _ = writeln!(out, "provider = \"{p}\"");
        }
        if let Some(ref e) = tr.endpoint {
            let _ = writeln!(out, "endpoint = \"{e}\"");
        }
        if let Some(ref p) = tr.pivot {
            let _ = writeln!(out, "pivot = \"{p}\"");
        }
        out.push('\n');
    }

    // [api_keys]
    let ak = &config.api_keys;
    if ak.openai.is_some()
        || ak.deepgram.is_some()
        || ak.elevenlabs.is_some()
        || ak.deepl.is_some()
        || ak.libretranslate.is_some()
    {
        out.push_str("[api_keys]\n");
        for (key, val) in [
            ("openai", &ak.openai),
            ("deepgram", &ak.deepgram),
            ("elevenlabs", &ak.elevenlabs),
            ("deepl", &ak.deepl),
            ("libretranslate", &ak.libretranslate),
        ] {
            if let Some(v) = val {
                let _ = writeln!(out, "{key} = \"{v}\"");
            }
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_key_handles_multibyte_characters() {
        // A byte-indexed slice would split the ü and panic
        assert_eq!(mask_key("schlüssel-geheim"), "schl...heim");
        assert_eq!(mask_key("日本語のキーです長い"), "日本語の...です長い");
        assert_eq!(mask_key("short"), "****");
        assert_eq!(mask_key(""), "****");
    }

    #[test]
    fn serialized_config_round_trips() {
        let config = PolyvoxConfigFile {
            language: Some("de".to_string()),
            history_turns: Some(10),
            transcripts: Some(false),
            llm: LlmFileConfig {
                url: Some("http://localhost:11434".to_string()),
                model: Some("llama3".to_string()),
            },
            voice: VoiceFileConfig {
                enabled: Some(true),
                stt_provider: Some("whisper".to_string()),
                tts_provider: Some("openai".to_string()),
                tts_voice: Some("alloy".to_string()),
                ..VoiceFileConfig::default()
            },
            translation: TranslationFileConfig {
                provider: Some("deepl".to_string()),
                endpoint: None,
                pivot: Some("en".to_string()),
            },
            api_keys: ApiKeysFileConfig {
                openai: Some("sk-test".to_string()),
                deepl: Some("dl-test".to_string()),
                ..ApiKeysFileConfig::default()
            },
        };

        let toml = serialize_config(&config);
        let parsed: PolyvoxConfigFile = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.language.as_deref(), Some("de"));
        assert_eq!(parsed.history_turns, Some(10));
        assert_eq!(parsed.llm.model.as_deref(), Some("llama3"));
        assert_eq!(parsed.voice.stt_provider.as_deref(), Some("whisper"));
        assert_eq!(parsed.translation.provider.as_deref(), Some("deepl"));
        assert_eq!(parsed.api_keys.openai.as_deref(), Some("sk-test"));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let config = PolyvoxConfigFile::default();
        let toml = serialize_config(&config);
        assert!(!toml.contains("[llm]"));
        assert!(!toml.contains("[api_keys]"));
    }
}
