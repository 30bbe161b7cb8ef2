//! Translation provider clients
//!
//! The LLM operates in a pivot language (English by default). When the
//! session language matches the pivot the translator is a no-op and no
//! request is made.

use serde::Deserialize;

use crate::{Error, Result};

/// Translation provider backend
#[derive(Clone, Copy, Debug)]
enum TranslateProvider {
    DeepL,
    LibreTranslate,
}

/// Response from the DeepL translate API
#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// Response from a LibreTranslate instance
#[derive(Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Translates text between the session language and the pivot
pub struct Translator {
    client: reqwest::Client,
    provider: TranslateProvider,
    api_key: String,
    endpoint: String,
    pivot: String,
}

impl Translator {
    /// Create a translator backed by DeepL
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_deepl(api_key: String, pivot: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("DeepL API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            provider: TranslateProvider::DeepL,
            api_key,
            endpoint: "https://api-free.deepl.com/v2/translate".to_string(),
            pivot,
        })
    }

    /// Create a translator backed by a LibreTranslate instance
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is empty
    pub fn new_libretranslate(endpoint: String, api_key: String, pivot: String) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(Error::Config(
                "LibreTranslate endpoint required".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            provider: TranslateProvider::LibreTranslate,
            api_key,
            endpoint,
            pivot,
        })
    }

    /// The pivot language code the LLM operates in
    #[must_use]
    pub fn pivot(&self) -> &str {
        &self.pivot
    }

    /// Translate session-language text into the pivot
    ///
    /// # Errors
    ///
    /// Returns error if the provider request fails
    pub async fn to_pivot(&self, text: &str, source: &str) -> Result<String> {
        if source.eq_ignore_ascii_case(&self.pivot) {
            return Ok(text.to_string());
        }
        let pivot = self.pivot.clone();
        self.translate(text, source, &pivot).await
    }

    /// Translate pivot-language text into the session language
    ///
    /// # Errors
    ///
    /// Returns error if the provider request fails
    pub async fn from_pivot(&self, text: &str, target: &str) -> Result<String> {
        if target.eq_ignore_ascii_case(&self.pivot) {
            return Ok(text.to_string());
        }
        let pivot = self.pivot.clone();
        self.translate(text, &pivot, target).await
    }

    /// Translate between two language codes
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        tracing::debug!(source, target, chars = text.len(), "translating");

        match self.provider {
            TranslateProvider::DeepL => self.translate_deepl(text, source, target).await,
            TranslateProvider::LibreTranslate => self.translate_libre(text, source, target).await,
        }
    }

    /// Translate using DeepL
    async fn translate_deepl(&self, text: &str, source: &str, target: &str) -> Result<String> {
        #[derive(serde::Serialize)]
        struct DeepLRequest<'a> {
            text: [&'a str; 1],
            source_lang: String,
            target_lang: String,
        }

        let request = DeepLRequest {
            text: [text],
            source_lang: source.to_uppercase(),
            target_lang: target.to_uppercase(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("DeepL-Auth-Key {}", self.api_key),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "DeepL API error");
            return Err(Error::Translate(format!("DeepL error {status}: {body}")));
        }

        let result: DeepLResponse = response.json().await?;
        result
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| Error::Translate("DeepL returned no translations".to_string()))
    }

    /// Translate using LibreTranslate
    async fn translate_libre(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let mut form = vec![
            ("q", text.to_string()),
            ("source", source.to_lowercase()),
            ("target", target.to_lowercase()),
            ("format", "text".to_string()),
        ];
        if !self.api_key.is_empty() {
            form.push(("api_key", self.api_key.clone()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "LibreTranslate error");
            return Err(Error::Translate(format!(
                "LibreTranslate error {status}: {body}"
            )));
        }

        let result: LibreResponse = response.json().await?;
        Ok(result.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_config_errors() {
        assert!(matches!(
            Translator::new_deepl(String::new(), "en".to_string()),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Translator::new_libretranslate(String::new(), String::new(), "en".to_string()),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn pivot_language_skips_the_network() {
        // No request should be made, so a dummy key never gets used
        let translator =
            Translator::new_deepl("dummy".to_string(), "en".to_string()).unwrap();

        let out = translator.to_pivot("hello", "en").await.unwrap();
        assert_eq!(out, "hello");

        let out = translator.from_pivot("hello", "EN").await.unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn deepl_response_parses() {
        let json = r#"{"translations": [{"detected_source_language": "DE", "text": "Hello"}]}"#;
        let parsed: DeepLResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.translations[0].text, "Hello");
    }

    #[test]
    fn libretranslate_response_parses() {
        let json = r#"{"translatedText": "Hola"}"#;
        let parsed: LibreResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.translated_text, "Hola");
    }
}
