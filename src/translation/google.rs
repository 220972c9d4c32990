use super::*;
use crate::providers::error_for_status;
use crate::providers::ProviderError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

/// Google Cloud Translation v2 backend.
pub struct GoogleTranslator {
    config: TranslateApiConfig,
    client: reqwest::Client,
    api_key: String,
}

impl GoogleTranslator {
    pub fn new(config: TranslateApiConfig, api_key: String) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            config,
            client,
            api_key,
        })
    }

    fn request<'a>(&self, text: &'a str, source: &'a str, target: &'a str) -> TranslateRequest<'a> {
        let source = match source {
            "auto" | "unknown" | "" => None,
            other => Some(other),
        };
        TranslateRequest {
            q: text,
            target,
            format: "text",
            source,
        }
    }
}

#[async_trait]
impl TranslationProvider for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    fn supported_languages(&self) -> Vec<String> {
        ["ja", "en", "zh", "ko", "es", "fr", "de", "it", "pt", "ru"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
        _context: Option<&TaskContext>,
    ) -> ProviderResult<TranslationResult> {
        let response = self
            .client
            .post(&self.config.base_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request(text, source, target))
            .send()
            .await?;
        let response = error_for_status(response).await?;
        let body: TranslateResponse = response.json().await?;

        let translation = body.data.translations.into_iter().next().ok_or_else(|| {
            ProviderError::MalformedResponse("No translations in Google response".to_string())
        })?;
        let detected = translation
            .detected_source_language
            .unwrap_or_else(|| source.to_string());

        Ok(TranslationResult::new(
            translation.translated_text,
            detected,
            target,
            HOSTED_API_CONFIDENCE,
            "google",
            "api",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator(base_url: &str) -> GoogleTranslator {
        let config = TranslateApiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 1,
        };
        GoogleTranslator::new(config, "test-key".to_string()).unwrap()
    }

    #[test]
    fn test_request_omits_auto_source() {
        let google = translator("http://127.0.0.1:9");
        let json = serde_json::to_value(google.request("猫", "auto", "en")).unwrap();
        assert_eq!(json["q"], "猫");
        assert_eq!(json["target"], "en");
        assert_eq!(json["format"], "text");
        assert!(json.get("source").is_none());

        let json = serde_json::to_value(google.request("cat", "en", "ja")).unwrap();
        assert_eq!(json["source"], "en");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"data":{"translations":[{"translatedText":"cat","detectedSourceLanguage":"ja"}]}}"#;
        let parsed: TranslateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.translations[0].translated_text, "cat");
        assert_eq!(
            parsed.data.translations[0].detected_source_language.as_deref(),
            Some("ja")
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let google = translator("http://127.0.0.1:9/translate");
        let err = google.translate("猫", "ja", "en", None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
