use async_trait::async_trait;
use futures_util::StreamExt;

use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::provider::LlmProvider;
use crate::llm::sse_parser;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse, StreamChunkKind};

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String) -> Self {
        Self {
            id,
            api_base,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> DroidClawResult<LlmResponse> {
        let body = serde_json::json!({
            "model": cfg.model,
            "messages": &messages,
            "stream": cfg.stream,
            "temperature": cfg.temperature,
        });

        tracing::debug!(
            provider = %self.id,
            model = %cfg.model,
            stream = cfg.stream,
            messages = messages.len(),
            "sending LLM request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(DroidClawError::LlmProvider(format!("{}: {}", status, err_body)));
        }

        if cfg.stream {
            self.handle_stream(response).await
        } else {
            let json: serde_json::Value = response.json().await?;
            response_from_json(&json)
        }
    }
}

impl OpenAiCompatibleProvider {
    /// Handle SSE streaming response, accumulating the full reply.
    async fn handle_stream(&self, response: reqwest::Response) -> DroidClawResult<LlmResponse> {
        let mut byte_stream = response.bytes_stream();
        let mut acc = StreamAccumulator::default();

        while let Some(result) = byte_stream.next().await {
            let bytes = result?;
            if acc.feed(&bytes) {
                break;
            }
        }

        let resp = acc.finish();
        tracing::info!(
            content_len = resp.content.len(),
            reasoning_len = resp.reasoning.len(),
            "LLM stream complete"
        );
        Ok(resp)
    }
}

/// Reassembles SSE lines split across network chunks.
///
/// Bytes are buffered until a full line arrives, so a multi-byte character
/// split between two chunks is decoded intact.
#[derive(Default)]
struct StreamAccumulator {
    line_buf: Vec<u8>,
    content: String,
    reasoning: String,
    done: bool,
}

impl StreamAccumulator {
    /// Returns true once the stream signalled completion.
    fn feed(&mut self, bytes: &[u8]) -> bool {
        self.line_buf.extend_from_slice(bytes);
        while let Some(pos) = self.line_buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.line_buf.drain(..=pos).collect();
            if self.handle_line(&line) {
                self.done = true;
                return true;
            }
        }
        false
    }

    /// Returns true for the `[DONE]` marker.
    fn handle_line(&mut self, raw: &[u8]) -> bool {
        let decoded = String::from_utf8_lossy(raw);
        let line = decoded.trim();
        if line.is_empty() {
            return false;
        }

        match sse_parser::parse_sse_line(line) {
            Ok(Some(chunk)) => match chunk.kind {
                StreamChunkKind::Reasoning => self.reasoning.push_str(&chunk.content),
                StreamChunkKind::Content => {
                    tracing::trace!(chunk = %chunk.content, "llm stream chunk");
                    self.content.push_str(&chunk.content);
                }
                StreamChunkKind::Done => return true,
            },
            Ok(None) => {}
            Err(e) => tracing::debug!("SSE parse skipped: {e}"),
        }
        false
    }

    /// Flushes a final line that arrived without a trailing newline.
    fn finish(mut self) -> LlmResponse {
        if !self.done {
            let rest = std::mem::take(&mut self.line_buf);
            self.handle_line(&rest);
        }
        LlmResponse {
            content: self.content,
            reasoning: self.reasoning,
        }
    }
}

fn response_from_json(json: &serde_json::Value) -> DroidClawResult<LlmResponse> {
    let message = &json["choices"][0]["message"];
    let content = message["content"].as_str().ok_or_else(|| {
        DroidClawError::LlmProvider(format!("no content in LLM response: {json}"))
    })?;
    let reasoning = message["reasoning_content"].as_str().unwrap_or_default();

    tracing::info!(content_len = content.len(), "LLM JSON response received");
    Ok(LlmResponse {
        content: content.to_string(),
        reasoning: reasoning.to_string(),
    })
}
