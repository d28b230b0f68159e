use crate::backend::AsrBackend;
use crate::sse::SseDecoder;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use voxscribe_core::{AsrConfig, AsrError, TranscribeOptions, Transcription};

const DASHSCOPE_API_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/multimodal-generation/generation";

/// Protocol B: the DashScope multimodal generation API driving an ASR
/// model. Supports one-shot and server-sent-event streaming requests.
pub struct DashScopeBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

// ── Request shapes ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct ContentPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<String>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
struct AsrOptions {
    enable_lid: bool,
    enable_itn: bool,
}

#[derive(Serialize)]
struct Parameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    incremental_output: Option<bool>,
    asr_options: AsrOptions,
}

#[derive(Serialize)]
struct Input {
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct DashScopeRequest {
    model: String,
    input: Input,
    parameters: Parameters,
}

// ── Response shapes ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DashScopeResponse {
    output: Option<Output>,
    message: Option<String>,
    code: Option<String>,
}

#[derive(Deserialize)]
struct Output {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    finish_reason: Option<String>,
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Vec<ContentText>,
    #[serde(default)]
    annotations: Vec<Annotation>,
}

#[derive(Deserialize)]
struct ContentText {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Annotation {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    language: String,
}

impl DashScopeBackend {
    pub fn new(config: &AsrConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DASHSCOPE_API_ENDPOINT.to_string()),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn build_request(
        &self,
        wav: &[u8],
        opts: &TranscribeOptions,
        incremental: bool,
    ) -> DashScopeRequest {
        // System prompt carries the language pin and user context; both
        // are optional and an empty prompt still needs the message slot.
        let mut system_lines = Vec::new();
        if !opts.language.is_empty() && opts.language != "auto" {
            system_lines.push(format!("asr language:{}", opts.language));
        }
        if !opts.context.is_empty() {
            system_lines.push(opts.context.clone());
        }

        let messages = vec![
            Message {
                role: "system",
                content: vec![ContentPart {
                    text: Some(system_lines.join("\n")),
                    audio: None,
                }],
            },
            Message {
                role: "user",
                content: vec![ContentPart {
                    text: None,
                    audio: Some(format!("data:audio/wav;base64,{}", BASE64.encode(wav))),
                }],
            },
        ];

        DashScopeRequest {
            model: self.model.clone(),
            input: Input { messages },
            parameters: Parameters {
                incremental_output: incremental.then_some(true),
                asr_options: AsrOptions {
                    enable_lid: opts.language == "auto" || opts.language.is_empty(),
                    enable_itn: opts.enable_itn,
                },
            },
        }
    }

    async fn post(
        &self,
        wav: &[u8],
        opts: &TranscribeOptions,
        incremental: bool,
    ) -> Result<reqwest::Response, AsrError> {
        if self.api_key.is_empty() {
            return Err(AsrError::MissingApiKey("dashscope".to_string()));
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(wav, opts, incremental));
        if incremental {
            request = request.header("X-DashScope-SSE", "enable");
        }

        let resp = request
            .send()
            .await
            .map_err(|e| AsrError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<DashScopeResponse>(&body)
                .ok()
                .and_then(|r| match (r.code, r.message) {
                    (Some(code), Some(msg)) => Some(format!("{code}: {msg}")),
                    (_, Some(msg)) => Some(msg),
                    (Some(code), _) => Some(code),
                    _ => None,
                })
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(AsrError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }
        Ok(resp)
    }
}

fn detected_language(annotations: &[Annotation]) -> Option<String> {
    annotations
        .iter()
        .find(|a| a.kind == "audio_info" && !a.language.is_empty())
        .map(|a| a.language.clone())
}

#[async_trait]
impl AsrBackend for DashScopeBackend {
    fn name(&self) -> &str {
        "dashscope"
    }

    async fn transcribe(
        &self,
        wav: &[u8],
        opts: &TranscribeOptions,
    ) -> Result<Transcription, AsrError> {
        let resp = self.post(wav, opts, false).await?;
        let body: DashScopeResponse = resp
            .json()
            .await
            .map_err(|e| AsrError::Transport(e.to_string()))?;

        let choice = body
            .output
            .as_ref()
            .and_then(|o| o.choices.first())
            .ok_or_else(|| {
                AsrError::Protocol(body.message.clone().unwrap_or_else(|| {
                    "response carried no choices".to_string()
                }))
            })?;

        // A usable result is a finished choice with non-empty text;
        // anything else is treated as a protocol failure, with the
        // server message when one is present.
        let text = choice
            .message
            .content
            .first()
            .map(|c| c.text.clone())
            .unwrap_or_default();
        if choice.finish_reason.as_deref() != Some("stop") || text.is_empty() {
            return Err(AsrError::Protocol(
                body.message
                    .unwrap_or_else(|| "no usable text in response".to_string()),
            ));
        }

        Ok(Transcription {
            text,
            language: detected_language(&choice.message.annotations).unwrap_or_default(),
        })
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn transcribe_streaming(
        &self,
        wav: &[u8],
        opts: &TranscribeOptions,
        partial_tx: mpsc::UnboundedSender<String>,
    ) -> Result<Transcription, AsrError> {
        let resp = self.post(wav, opts, true).await?;
        let mut stream = resp.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut accumulated = String::new();
        let mut language = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| AsrError::Transport(format!("stream aborted: {e}")))?;
            for payload in decoder.feed(&chunk) {
                let event: DashScopeResponse = match serde_json::from_str(&payload) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("skipping undecodable stream event: {e}");
                        continue;
                    }
                };
                if let (Some(code), Some(msg)) = (&event.code, &event.message) {
                    return Err(AsrError::Protocol(format!("{code}: {msg}")));
                }
                let Some(choice) = event.output.as_ref().and_then(|o| o.choices.first())
                else {
                    continue;
                };

                if let Some(fragment) = choice.message.content.first() {
                    if !fragment.text.is_empty() {
                        accumulated.push_str(&fragment.text);
                        let _ = partial_tx.send(accumulated.clone());
                    }
                }
                if let Some(lang) = detected_language(&choice.message.annotations) {
                    language = lang;
                }
                if choice.finish_reason.as_deref() == Some("stop") {
                    return Ok(Transcription {
                        text: accumulated,
                        language,
                    });
                }
            }
        }

        if accumulated.is_empty() {
            return Err(AsrError::Protocol(
                "stream ended with no recognized text".to_string(),
            ));
        }
        tracing::warn!("stream ended without a finish marker");
        Ok(Transcription {
            text: accumulated,
            language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(server: &mockito::ServerGuard) -> AsrConfig {
        AsrConfig {
            backend: "dashscope".to_string(),
            endpoint: Some(server.url() + "/"),
            api_key: "sk-test".to_string(),
            ..Default::default()
        }
    }

    fn dummy_wav() -> Vec<u8> {
        vec![0x52, 0x49, 0x46, 0x46, 0, 0, 0, 0]
    }

    #[test]
    fn test_missing_api_key_fails_before_network() {
        let config = AsrConfig {
            backend: "dashscope".to_string(),
            api_key: String::new(),
            ..Default::default()
        };
        let backend = DashScopeBackend::new(&config);
        let err = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(backend.transcribe(&dummy_wav(), &TranscribeOptions::default()))
            .expect_err("should fail");
        assert!(matches!(err, AsrError::MissingApiKey(_)));
    }

    #[test]
    fn test_lid_enabled_only_for_auto_language() {
        let backend = DashScopeBackend::new(&AsrConfig::default());
        let auto = backend.build_request(
            &dummy_wav(),
            &TranscribeOptions {
                language: "auto".to_string(),
                ..Default::default()
            },
            false,
        );
        assert!(auto.parameters.asr_options.enable_lid);

        let pinned = backend.build_request(
            &dummy_wav(),
            &TranscribeOptions {
                language: "en".to_string(),
                ..Default::default()
            },
            false,
        );
        assert!(!pinned.parameters.asr_options.enable_lid);
    }

    #[test]
    fn test_incremental_flag_only_on_streaming_requests() {
        let backend = DashScopeBackend::new(&AsrConfig::default());
        let opts = TranscribeOptions::default();
        assert_eq!(
            backend
                .build_request(&dummy_wav(), &opts, false)
                .parameters
                .incremental_output,
            None
        );
        assert_eq!(
            backend
                .build_request(&dummy_wav(), &opts, true)
                .parameters
                .incremental_output,
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"output":{"choices":[{"finish_reason":"stop","message":{
                    "content":[{"text":"guten tag"}],
                    "annotations":[{"type":"audio_info","language":"de"}]
                }}]}}"#,
            )
            .create_async()
            .await;

        let backend = DashScopeBackend::new(&config_for(&server));
        let result = backend
            .transcribe(&dummy_wav(), &TranscribeOptions::default())
            .await
            .expect("transcribe should succeed");
        assert_eq!(result.text, "guten tag");
        assert_eq!(result.language, "de");
    }

    #[tokio::test]
    async fn test_unfinished_choice_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"output":{"choices":[{"finish_reason":"length","message":{
                    "content":[{"text":"trunc"}],"annotations":[]}}]},
                    "message":"generation truncated"}"#,
            )
            .create_async()
            .await;

        let backend = DashScopeBackend::new(&config_for(&server));
        let err = backend
            .transcribe(&dummy_wav(), &TranscribeOptions::default())
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("generation truncated"), "got: {err}");
    }

    #[tokio::test]
    async fn test_http_error_carries_code_and_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(401)
            .with_body(r#"{"code":"InvalidApiKey","message":"key rejected"}"#)
            .create_async()
            .await;

        let backend = DashScopeBackend::new(&config_for(&server));
        let err = backend
            .transcribe(&dummy_wav(), &TranscribeOptions::default())
            .await
            .expect_err("should fail");
        let msg = err.to_string();
        assert!(msg.contains("401"), "got: {msg}");
        assert!(msg.contains("InvalidApiKey"), "got: {msg}");
        assert!(msg.contains("key rejected"), "got: {msg}");
    }
}
