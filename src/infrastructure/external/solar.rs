//! チャット補完による要約クライアント
//! Application層のSummarizationClientトレイトを実装

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::traits::SummarizationClient;
use crate::domain::Summary;
use crate::error::{Result, VoiceNotesError};
use crate::utils::config::EnvConfig;

const DEFAULT_BASE_URL: &str = "https://api.upstage.ai/v1/solar";
const DEFAULT_MODEL: &str = "solar-mini";

/// 要約指示プロンプトを組み立てます。テンプレートは固定。
fn summary_prompt(text: &str) -> String {
    format!(
        "Provide summary of this in a detail way, so that I can use it to study deeply for my exams. Just provide the content \"{}\"",
        text
    )
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// 応答から要約テキストを抽出します。本文なしは `Summary::Empty`。
fn extract_summary(response: ChatCompletionResponse) -> Summary {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    Summary::from_text(content)
}

/// OpenAI互換のチャット補完エンドポイントで単発要約を行うクライアント
pub struct SolarSummarizer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl SolarSummarizer {
    /// 環境設定からクライアントを作成
    pub fn new() -> Result<Self> {
        let config = EnvConfig::get();
        let api_key = config
            .summarization_api_key
            .clone()
            .ok_or_else(|| VoiceNotesError::SummarizationError("OPENAI_API_KEY not set".to_string()))?;
        let base_url = config
            .summarization_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = config
            .summarization_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        })
    }
}

#[async_trait]
impl SummarizationClient for SolarSummarizer {
    async fn summarize(&self, text: &str) -> Result<Summary> {
        println!("Summarizing text...");

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: summary_prompt(text),
            }],
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceNotesError::SummarizationError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoiceNotesError::SummarizationError(e.to_string()))?;

        if !status.is_success() {
            return Err(VoiceNotesError::SummarizationError(format!(
                "API request failed with status {}: {}",
                status, body
            )));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| VoiceNotesError::SummarizationError(format!("invalid response: {}", e)))?;

        Ok(extract_summary(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// プロンプトテンプレートに原文が埋め込まれる
    #[test]
    fn prompt_embeds_source_text() {
        let prompt = summary_prompt("photosynthesis notes");
        assert!(prompt.contains("\"photosynthesis notes\""));
        assert!(prompt.starts_with("Provide summary of this in a detail way"));
    }

    /// 先頭choiceの本文が要約として返る
    #[test]
    fn first_choice_content_is_extracted() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [
                {"message": {"role": "assistant", "content": "the summary"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(extract_summary(response), Summary::Text("the summary".into()));
    }

    /// choicesなし・本文なしはEmpty（エラーではない）
    #[test]
    fn missing_content_maps_to_empty() {
        let no_choices: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(extract_summary(no_choices), Summary::Empty);

        let null_content: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert_eq!(extract_summary(null_content), Summary::Empty);
    }
}
