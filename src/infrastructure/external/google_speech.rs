//! Google Speech-to-Text クライアント
//! Application層のTranscriptionClientトレイトを実装

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::application::traits::TranscriptionClient;
use crate::domain::Transcription;
use crate::error::{Result, VoiceNotesError};
use crate::utils::config::EnvConfig;

const RECOGNIZE_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

/// 認識パラメータ。録音アーティファクトがWAVのためLINEAR16固定。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'static str,
    enable_automatic_punctuation: bool,
    model: &'static str,
    use_enhanced: bool,
}

impl RecognitionConfig {
    /// サンプルレート以外は固定のパラメータを組み立てます。
    ///
    /// LINEAR16では `sampleRateHertz` がWAVヘッダと一致しないと
    /// INVALID_ARGUMENTで拒否されるため、レートは必ずアーティファクト
    /// 由来の実測値を渡すこと。録音デバイスのデフォルトレートは
    /// 環境ごとに異なる（44.1kHz/48kHz混在）。
    fn for_sample_rate(sample_rate_hertz: u32) -> Self {
        Self {
            encoding: "LINEAR16",
            sample_rate_hertz,
            language_code: "en-US",
            enable_automatic_punctuation: true,
            model: "default",
            use_enhanced: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    /// base64エンコード済み音声データ
    content: String,
}

#[derive(Debug, Serialize)]
struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<SpeechRecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct SpeechRecognitionResult {
    #[serde(default)]
    alternatives: Vec<SpeechRecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
struct SpeechRecognitionAlternative {
    #[serde(default)]
    transcript: String,
}

/// 応答から転写テキストを抽出します。
///
/// 各結果の先頭候補の転写を、サービスが返した順のまま改行で連結する。
/// 結果ゼロ件は無音検出として `NoSpeech`（トランスポート失敗とは別物）。
fn extract_transcript(response: RecognizeResponse) -> Transcription {
    let transcription = response
        .results
        .iter()
        .filter_map(|result| result.alternatives.first())
        .map(|alt| alt.transcript.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Transcription::from_text(transcription)
}

/// アーティファクトのバイト列を読み込みます。
async fn read_artifact(locator: &str) -> Result<Vec<u8>> {
    tokio::fs::read(locator).await.map_err(|e| {
        VoiceNotesError::TranscriptionError(format!("failed to read audio artifact: {}", e))
    })
}

/// WAVヘッダから実際のサンプルレートを取り出します。
fn wav_sample_rate(bytes: &[u8]) -> Result<u32> {
    let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).map_err(|e| {
        VoiceNotesError::TranscriptionError(format!("invalid audio artifact: {}", e))
    })?;
    Ok(reader.spec().sample_rate)
}

/// Google Speech-to-Text REST APIのクライアント
pub struct GoogleSpeechClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GoogleSpeechClient {
    /// 環境設定からクライアントを作成
    pub fn new() -> Result<Self> {
        let config = EnvConfig::get();
        let api_key = config
            .google_cloud_api_key
            .clone()
            .ok_or_else(|| VoiceNotesError::TranscriptionError("GOOGLE_CLOUD_API_KEY not set".to_string()))?;
        Ok(Self::with_api_key(api_key))
    }

    /// APIキーを指定して作成
    pub fn with_api_key(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: RECOGNIZE_URL.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptionClient for GoogleSpeechClient {
    async fn transcribe(&self, locator: &str) -> Result<Transcription> {
        println!("Processing audio from: {}", locator);

        let bytes = read_artifact(locator).await?;
        let request = RecognizeRequest {
            config: RecognitionConfig::for_sample_rate(wav_sample_rate(&bytes)?),
            audio: RecognitionAudio {
                content: BASE64.encode(&bytes),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceNotesError::TranscriptionError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoiceNotesError::TranscriptionError(e.to_string()))?;

        if !status.is_success() {
            return Err(VoiceNotesError::TranscriptionError(format!(
                "API request failed with status {}: {}",
                status, body
            )));
        }

        let parsed: RecognizeResponse = serde_json::from_str(&body)
            .map_err(|e| VoiceNotesError::TranscriptionError(format!("invalid response: {}", e)))?;

        Ok(extract_transcript(parsed))
    }
}
