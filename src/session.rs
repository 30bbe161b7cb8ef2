//! Interactive assistant session
//!
//! Runs the pipeline loop: obtain an utterance (typed or spoken),
//! translate it to the pivot language, send it to the LLM with the
//! conversation history, translate the reply back, then print and
//! speak it.

use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use dialoguer::{Input, Select};

use crate::config::Config;
use crate::lang::{self, LANGUAGES, Language};
use crate::llm::{ChatMessage, OllamaClient};
use crate::stt::SpeechToText;
use crate::translate::Translator;
use crate::tts::TextToSpeech;
use crate::voice::{AudioCapture, AudioPlayback, SAMPLE_RATE, UtteranceDetector, samples_to_wav};
use crate::{Error, Result};

/// How the user provides each utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Typed lines
    Text,
    /// Microphone capture with endpointing
    Voice,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Voice => write!(f, "voice"),
        }
    }
}

/// Single-key commands accepted at the session prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptCommand {
    /// Switch input mode
    ChangeMode,
    /// Switch session language
    ChangeLanguage,
    /// End the session
    Quit,
}

/// Parse a prompt line into a command, if it is one
fn parse_command(line: &str) -> Option<PromptCommand> {
    match line.trim().to_lowercase().as_str() {
        "m" => Some(PromptCommand::ChangeMode),
        "l" => Some(PromptCommand::ChangeLanguage),
        "q" => Some(PromptCommand::Quit),
        _ => None,
    }
}

/// An interactive assistant session
pub struct Session {
    config: Config,
    ollama: OllamaClient,
    model: String,
    language: Language,
    mode: InputMode,
    translator: Option<Translator>,
    stt: Option<SpeechToText>,
    tts: Option<TextToSpeech>,
    history: Vec<ChatMessage>,
    transcript: Option<TranscriptWriter>,
}

impl Session {
    /// Set up a session: model, input mode, and language selection
    ///
    /// # Errors
    ///
    /// Returns error if Ollama has no models, or a configured provider
    /// cannot be constructed
    pub async fn new(config: Config, model_override: Option<String>) -> Result<Self> {
        let ollama = OllamaClient::new(config.llm.url.clone());

        let model = match model_override.or_else(|| config.llm.model.clone()) {
            Some(m) => m,
            None => {
                let models = ollama.list_models().await?;
                if models.is_empty() {
                    return Err(Error::Llm(
                        "no local models found, install an Ollama model first".to_string(),
                    ));
                }
                select_model(&models)?
            }
        };
        tracing::info!(model, "model selected");

        let mode = if config.voice.enabled {
            select_mode()?
        } else {
            InputMode::Text
        };

        // Without an explicit --language, env var, or config entry,
        // ask at startup rather than silently assuming the default
        let language = if config.language_explicit {
            lang::by_code(&config.language)?
        } else {
            select_language(lang::by_code(&config.language)?)?
        };

        // Voice mode needs STT; TTS is used in both modes when voice
        // output is enabled
        let (stt, tts) = if config.voice.enabled {
            (Some(config.build_stt()?), Some(config.build_tts()?))
        } else {
            (None, None)
        };

        let translator = build_translator(&config);

        let transcript = if config.transcripts {
            match TranscriptWriter::create(&config.data_dir) {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(error = %e, "transcript disabled");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            config,
            ollama,
            model,
            language,
            mode,
            translator,
            stt,
            tts,
            history: Vec::new(),
            transcript,
        })
    }

    /// Run the session loop until the user quits
    ///
    /// # Errors
    ///
    /// Returns error on unrecoverable audio or terminal failures
    pub async fn run(&mut self) -> Result<()> {
        println!(
            "\npolyvox ready — model {}, language {}, {} input",
            self.model, self.language, self.mode
        );
        println!("Commands: m = change mode, l = change language, q = quit\n");

        loop {
            let utterance = match self.mode {
                InputMode::Text => self.read_text_input()?,
                InputMode::Voice => self.read_voice_input().await?,
            };

            let utterance = match utterance {
                PromptResult::Utterance(text) => text,
                PromptResult::Command(PromptCommand::ChangeMode) => {
                    self.mode = select_mode()?;
                    continue;
                }
                PromptResult::Command(PromptCommand::ChangeLanguage) => {
                    self.language = select_language(self.language)?;
                    continue;
                }
                PromptResult::Command(PromptCommand::Quit) => break,
                PromptResult::Empty => {
                    println!("No input detected, try again.");
                    continue;
                }
            };

            if let Err(e) = self.run_turn(&utterance).await {
                tracing::error!(error = %e, "turn failed");
                println!("Something went wrong: {e}");
            }
        }

        println!("Bye!");
        Ok(())
    }

    /// Run one exchange through the pipeline
    async fn run_turn(&mut self, utterance: &str) -> Result<()> {
        // Translate the utterance into the pivot language for the LLM.
        // Translation failures degrade to the untranslated text.
        let prompt = match &self.translator {
            Some(tr) => match tr.to_pivot(utterance, self.language.code).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "translation failed, sending untranslated text");
                    utterance.to_string()
                }
            },
            None => utterance.to_string(),
        };

        self.history.push(ChatMessage::user(prompt));
        self.trim_history();

        println!("Thinking...");
        let reply = match self.ollama.chat(&self.model, &self.history).await {
            Ok(reply) => reply,
            Err(e) => {
                // Keep the history consistent: an unanswered prompt
                // must not linger in the LLM context
                self.history.pop();
                return Err(e);
            }
        };
        self.history.push(ChatMessage::assistant(reply.clone()));

        let localized = match &self.translator {
            Some(tr) => match tr.from_pivot(&reply, self.language.code).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "translation failed, showing untranslated reply");
                    reply.clone()
                }
            },
            None => reply.clone(),
        };

        println!("Assistant: {localized}\n");

        if let Some(w) = &mut self.transcript {
            w.append(self.language.code, utterance, &localized);
        }

        self.speak(&localized).await;
        Ok(())
    }

    /// Synthesize and play the reply, when voice output is enabled
    async fn speak(&self, text: &str) {
        let Some(tts) = &self.tts else {
            return;
        };

        let audio = match tts.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(error = %e, "TTS failed");
                return;
            }
        };

        match AudioPlayback::new() {
            Ok(mut playback) => {
                if let Err(e) = playback.play_mp3(&audio).await {
                    tracing::warn!(error = %e, "playback failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "no playback device"),
        }
    }

    /// Keep the history within the configured turn budget
    fn trim_history(&mut self) {
        let max_messages = self.config.history_turns.saturating_mul(2);
        if self.history.len() > max_messages {
            let drop = self.history.len() - max_messages;
            self.history.drain(..drop);
        }
    }

    /// Read a typed utterance
    fn read_text_input(&self) -> Result<PromptResult> {
        let line: String = Input::new()
            .with_prompt(format!("You ({})", self.language.code))
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_err)?;

        if let Some(cmd) = parse_command(&line) {
            return Ok(PromptResult::Command(cmd));
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(PromptResult::Empty);
        }
        Ok(PromptResult::Utterance(line.to_string()))
    }

    /// Capture and transcribe a spoken utterance
    async fn read_voice_input(&self) -> Result<PromptResult> {
        let line: String = Input::new()
            .with_prompt("Press Enter to speak (or m/l/q)")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_err)?;

        if let Some(cmd) = parse_command(&line) {
            return Ok(PromptResult::Command(cmd));
        }

        let Some(stt) = &self.stt else {
            return Err(Error::Config("voice input requires STT".to_string()));
        };

        let samples = self.capture_utterance().await?;
        if samples.is_empty() {
            return Ok(PromptResult::Empty);
        }

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        let transcript = stt.transcribe(&wav, self.language.code).await?;
        let transcript = transcript.trim();

        if transcript.is_empty() {
            return Ok(PromptResult::Empty);
        }

        println!("You ({}): {transcript}", self.language.code);
        Ok(PromptResult::Utterance(transcript.to_string()))
    }

    /// Record from the microphone until the utterance ends
    async fn capture_utterance(&self) -> Result<Vec<f32>> {
        let mut capture = AudioCapture::new()?;
        let mut detector = UtteranceDetector::new(self.config.voice.max_utterance_secs);

        capture.start()?;
        println!(
            "Listening... (up to {}s, stops on silence)",
            self.config.voice.max_utterance_secs
        );

        // Idle window: give up if no speech starts within a few seconds
        let idle_timeout = Duration::from_secs(5);
        let started = std::time::Instant::now();

        let samples = loop {
            tokio::time::sleep(Duration::from_millis(100)).await;

            let chunk = capture.take_buffer()?;
            if chunk.is_empty() {
                continue;
            }

            if detector.process(&chunk) {
                break detector.take_utterance();
            }

            if !detector.is_listening() && started.elapsed() > idle_timeout {
                tracing::debug!("no speech detected within idle window");
                break Vec::new();
            }
        };

        capture.stop();
        Ok(samples)
    }
}

/// Outcome of one prompt interaction
enum PromptResult {
    /// A usable utterance
    Utterance(String),
    /// A session command
    Command(PromptCommand),
    /// Nothing usable (blank line, silence, empty transcript)
    Empty,
}

/// Build the translator, degrading to pass-through when unconfigured
///
/// A missing key or endpoint must not keep the session from starting:
/// pivot-language sessions never need the translator, and other
/// sessions fall back to untranslated text.
fn build_translator(config: &Config) -> Option<Translator> {
    match config.build_translator() {
        Ok(translator) => Some(translator),
        Err(e) => {
            tracing::warn!(error = %e, "translation unavailable, continuing without it");
            None
        }
    }
}

/// Prompt for an LLM model from the installed list
fn select_model(models: &[String]) -> Result<String> {
    let idx = Select::new()
        .with_prompt("Select a model")
        .items(models)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    Ok(models[idx].clone())
}

/// Prompt for the input mode
fn select_mode() -> Result<InputMode> {
    let idx = Select::new()
        .with_prompt("Select input mode")
        .items(&["Text", "Voice"])
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    Ok(if idx == 0 {
        InputMode::Text
    } else {
        InputMode::Voice
    })
}

/// Prompt for the session language
fn select_language(current: Language) -> Result<Language> {
    let default = LANGUAGES
        .iter()
        .position(|l| l.code == current.code)
        .unwrap_or(0);

    let idx = Select::new()
        .with_prompt("Select language")
        .items(LANGUAGES)
        .default(default)
        .interact()
        .map_err(prompt_err)?;

    Ok(LANGUAGES[idx])
}

/// Convert a dialoguer error into a crate error
fn prompt_err(e: dialoguer::Error) -> Error {
    Error::Io(std::io::Error::other(e))
}

/// Appends completed exchanges to a per-session log file
struct TranscriptWriter {
    file: std::fs::File,
    path: PathBuf,
}

impl TranscriptWriter {
    /// Create a transcript file under the data directory
    fn create(data_dir: &std::path::Path) -> Result<Self> {
        let name = format!(
            "session-{}.log",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        );
        let path = data_dir.join(name);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;

        tracing::debug!(path = %path.display(), "transcript started");
        Ok(Self { file, path })
    }

    /// Append one exchange; failures only warn
    fn append(&mut self, language: &str, user: &str, assistant: &str) {
        let ts = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%z");
        let entry = format!("[{ts}] you ({language}): {user}\n[{ts}] assistant: {assistant}\n");

        if let Err(e) = self.file.write_all(entry.as_bytes()) {
            tracing::warn!(path = %self.path.display(), error = %e, "transcript write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_translation_key_degrades_to_passthrough() {
        // Out-of-box config has no DeepL key; the session still starts.
        let config = bare_config();
        assert!(build_translator(&config).is_none());

        let mut configured = bare_config();
        configured.api_keys.deepl = Some("dl-test".into());
        assert!(build_translator(&configured).is_some());
    }

    fn bare_config() -> Config {
        use crate::config::{ApiKeys, LlmConfig, TranslationConfig, VoiceConfig};

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

    #[test]
    fn commands_parse_case_insensitively() {
        assert_eq!(parse_command("m"), Some(PromptCommand::ChangeMode));
        assert_eq!(parse_command(" M "), Some(PromptCommand::ChangeMode));
        assert_eq!(parse_command("l"), Some(PromptCommand::ChangeLanguage));
        assert_eq!(parse_command("Q"), Some(PromptCommand::Quit));
    }

    #[test]
    fn ordinary_text_is_not_a_command() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("more please"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn input_mode_displays_lowercase() {
        assert_eq!(InputMode::Text.to_string(), "text");
        assert_eq!(InputMode::Voice.to_string(), "voice");
    }

    #[test]
    fn transcript_appends_exchanges() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = TranscriptWriter::create(dir.path()).unwrap();

        writer.append("de", "Hallo", "Hallo! Wie kann ich helfen?");
        writer.append("de", "Danke", "Gern geschehen.");

        let content = std::fs::read_to_string(&writer.path).unwrap();
        assert!(content.contains("you (de): Hallo"));
        assert!(content.contains("assistant: Gern geschehen."));
        assert_eq!(content.lines().count(), 4);
    }
}
