//! Supported session languages
//!
//! One table drives the selection menu, the STT language hint, and the
//! translation target. Codes are ISO 639-1.

use crate::{Error, Result};

/// A supported language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// ISO 639-1 code (e.g. "en", "de")
    pub code: &'static str,
    /// English display name
    pub name: &'static str,
}

/// Languages offered by the session language menu
pub const LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English" },
    Language { code: "es", name: "Spanish" },
    Language { code: "fr", name: "French" },
    Language { code: "de", name: "German" },
    Language { code: "it", name: "Italian" },
    Language { code: "pt", name: "Portuguese" },
    Language { code: "nl", name: "Dutch" },
    Language { code: "pl", name: "Polish" },
    Language { code: "ru", name: "Russian" },
    Language { code: "tr", name: "Turkish" },
    Language { code: "ar", name: "Arabic" },
    Language { code: "hi", name: "Hindi" },
    Language { code: "ur", name: "Urdu" },
    Language { code: "zh", name: "Chinese" },
    Language { code: "ja", name: "Japanese" },
    Language { code: "ko", name: "Korean" },
];

/// Look up a language by ISO code, case-insensitively
///
/// # Errors
///
/// Returns [`Error::UnknownLanguage`] if the code is not in the table
pub fn by_code(code: &str) -> Result<Language> {
    let normalized = code.trim().to_lowercase();
    LANGUAGES
        .iter()
        .find(|l| l.code == normalized)
        .copied()
        .ok_or_else(|| Error::UnknownLanguage(code.to_string()))
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(by_code("EN").unwrap().name, "English");
        assert_eq!(by_code("  de ").unwrap().name, "German");
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(matches!(by_code("xx"), Err(Error::UnknownLanguage(_))));
        assert!(matches!(by_code(""), Err(Error::UnknownLanguage(_))));
    }

    #[test]
    fn display_includes_code() {
        let lang = by_code("fr").unwrap();
        assert_eq!(lang.to_string(), "French (fr)");
    }
}
