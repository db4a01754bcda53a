//! Remote client for a running convograph server
//!
//! Information Hiding:
//! - URL layout and request shapes hidden behind typed methods
//! - SSE framing is decoded here; callers receive `StreamEvent`s

use crate::api::{StreamEvent, ThreadState};
use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::{Client, Url};
use serde_json::json;
use std::time::Duration;

/// One decoded server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental SSE decoder; frames and UTF-8 sequences may be split
/// across network chunks
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(frame) = parse_block(&String::from_utf8_lossy(&block)) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_block(block: &str) -> Option<SseFrame> {
    let mut event = String::from("message");
    let mut data = Vec::new();

    for line in block.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event = value.trim_start().to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
    }

    // comment-only blocks (keep-alives) carry no data
    if data.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data.join("\n"),
    })
}

pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/threads/{thread_id}/{tail..}` with the id as one encoded segment
    fn thread_url(&self, thread_id: &str, tail: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid backend URL '{}'", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Backend URL '{}' cannot be a base", self.base_url))?
            .pop_if_empty()
            .push("threads")
            .push(thread_id)
            .extend(tail);
        Ok(url)
    }

    /// Stored history for a thread
    pub async fn fetch_history(&self, thread_id: &str) -> Result<ThreadState> {
        let url = self.thread_url(thread_id, &["state"])?;
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to reach backend")?
            .error_for_status()?;

        Ok(response.json::<ThreadState>().await?)
    }

    /// Send one human message over `/stream` and return the terminal event
    pub async fn send_turn(&self, thread_id: &str, content: &str) -> Result<StreamEvent> {
        let payload = json!({
            "input": {"messages": [{"type": "human", "content": content}]},
            "config": {"thread_id": thread_id}
        });

        let response = self
            .client
            .post(format!("{}/stream", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to reach backend")?
            .error_for_status()?;

        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.context("Stream interrupted")?;
            for frame in decoder.push(&bytes) {
                tracing::debug!("[BackendClient] Received '{}' event", frame.event);
                if frame.event == "message" || frame.event == "error" {
                    let event: StreamEvent = serde_json::from_str(&frame.data)
                        .context("Malformed stream event")?;
                    return Ok(event);
                }
            }
        }

        Err(anyhow::anyhow!("Stream ended without an event"))
    }

    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let url = self.thread_url(thread_id, &[])?;
        let response = self.client.delete(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Delete failed ({}): {}", status, body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_decoder_handles_split_frames() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.push(b"event: mess").is_empty());
        assert!(decoder.push(b"age\r\ndata: {\"a\":").is_empty());
        let frames = decoder.push(b"1}\n\n:\n\nevent: error\ndata: x\n\n");

        assert_eq!(
            frames,
            vec![
                SseFrame {
                    event: "message".to_string(),
                    data: "{\"a\":1}".to_string()
                },
                SseFrame {
                    event: "error".to_string(),
                    data: "x".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_send_turn_reads_message_event() {
        let mock_server = MockServer::start().await;
        let body = "event: message\ndata: {\"node\":\"conversation\",\"messages\":[{\"type\":\"human\",\"content\":\"hi\"},{\"type\":\"ai\",\"content\":\"hello\"}],\"state\":{\"summary\":\"\",\"message_count\":2,\"compacted\":false}}\n\n";

        Mock::given(method("POST"))
            .and(path("/stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(mock_server.uri());
        let event = client.send_turn("t1", "hi").await.unwrap();

        match event {
            StreamEvent::Message { messages, .. } => {
                assert_eq!(messages.last().unwrap().content, "hello");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_turn_reads_error_event() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("event: error\ndata: {\"error\":\"quota exceeded\"}\n\n"),
            )
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(mock_server.uri());
        let event = client.send_turn("t1", "hi").await.unwrap();

        assert!(matches!(event, StreamEvent::Error { error } if error == "quota exceeded"));
    }

    #[tokio::test]
    async fn test_fetch_history() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/threads/t1/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"type": "human", "content": "hi"}],
                "summary": ""
            })))
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(mock_server.uri());
        let state = client.fetch_history("t1").await.unwrap();

        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.summary, "");
    }

    #[tokio::test]
    async fn test_thread_id_is_one_path_segment() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/threads/a%2Fb/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [],
                "summary": "kept"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/threads/a%2Fb"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(format!("{}/", mock_server.uri()));
        let state = client.fetch_history("a/b").await.unwrap();
        client.delete_thread("a/b").await.unwrap();

        assert_eq!(state.summary, "kept");
    }
}
