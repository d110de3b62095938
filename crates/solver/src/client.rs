//! HTTP client for the solve backend
//!
//! Four POST endpoints: plain and image-bearing solves, each with a
//! one-shot JSON variant and an SSE streaming variant. Streaming
//! responses carry one text chunk per `data:` line.

use crate::{BackendError, BackendResult};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::time::Duration;

const TEXT_TIMEOUT: Duration = Duration::from_secs(180);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(240);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct TextPayload<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ImagePayload<'a> {
    question: &'a str,
    image: String,
}

#[derive(Deserialize)]
struct SolveResponse {
    answer: Option<String>,
}

/// Blocking client for the solve API
pub struct BackendClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl BackendClient {
    pub fn new(base_url: &str) -> BackendResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One-shot text solve
    pub fn solve(&self, text: &str) -> BackendResult<String> {
        self.post_json("/api/solve", &TextPayload { text }, TEXT_TIMEOUT)
    }

    /// Streaming text solve; `on_chunk` receives each SSE payload in order
    pub fn solve_stream<F>(&self, text: &str, on_chunk: F) -> BackendResult<()>
    where
        F: FnMut(&str),
    {
        self.post_sse("/api/solve-stream", &TextPayload { text }, TEXT_TIMEOUT, on_chunk)
    }

    /// One-shot image solve; `image_bytes` is an encoded (JPEG) frame
    pub fn solve_with_image(&self, image_bytes: &[u8], question: &str) -> BackendResult<String> {
        let payload = ImagePayload {
            question,
            image: general_purpose::STANDARD.encode(image_bytes),
        };
        self.post_json("/api/solve-image", &payload, IMAGE_TIMEOUT)
    }

    /// Streaming image solve
    pub fn solve_with_image_stream<F>(
        &self,
        image_bytes: &[u8],
        question: &str,
        on_chunk: F,
    ) -> BackendResult<()>
    where
        F: FnMut(&str),
    {
        let payload = ImagePayload {
            question,
            image: general_purpose::STANDARD.encode(image_bytes),
        };
        self.post_sse("/api/solve-image-stream", &payload, IMAGE_TIMEOUT, on_chunk)
    }

    fn post_json<P: Serialize>(
        &self,
        path: &str,
        payload: &P,
        timeout: Duration,
    ) -> BackendResult<String> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(payload)
            .timeout(timeout)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_answer(&body)
    }

    fn post_sse<P, F>(
        &self,
        path: &str,
        payload: &P,
        timeout: Duration,
        on_chunk: F,
    ) -> BackendResult<()>
    where
        P: Serialize,
        F: FnMut(&str),
    {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(payload)
            .timeout(timeout)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        consume_sse(std::io::BufReader::new(response), on_chunk)?;
        Ok(())
    }
}

/// Extract `answer` from a solve response body; absent or null means
/// an empty answer, not an error.
fn parse_answer(body: &str) -> BackendResult<String> {
    let parsed: SolveResponse = serde_json::from_str(body)?;
    Ok(parsed.answer.unwrap_or_default())
}

/// Feed each SSE `data:` payload to `on_chunk`.
///
/// Lines without the prefix and empty payloads are dropped; invalid
/// UTF-8 is replaced rather than aborting the stream.
fn consume_sse<R, F>(mut reader: R, mut on_chunk: F) -> std::io::Result<()>
where
    R: BufRead,
    F: FnMut(&str),
{
    let mut raw = Vec::new();
    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            continue;
        }
        on_chunk(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect_sse(input: &[u8]) -> Vec<String> {
        let mut chunks = Vec::new();
        consume_sse(Cursor::new(input.to_vec()), |c| chunks.push(c.to_string())).unwrap();
        chunks
    }

    #[test]
    fn sse_yields_data_lines_in_order() {
        let body = b"data: first\ndata: second\ndata: third\n";
        assert_eq!(collect_sse(body), vec!["first", "second", "third"]);
    }

    #[test]
    fn sse_skips_blank_lines_comments_and_empty_payloads() {
        let body = b"\ndata: keep\n\nevent: done\n: comment\ndata:\ndata:   \n";
        assert_eq!(collect_sse(body), vec!["keep"]);
    }

    #[test]
    fn sse_trims_payload_whitespace_and_crlf() {
        let body = b"data:   padded value  \r\ndata:tight\r\n";
        assert_eq!(collect_sse(body), vec!["padded value", "tight"]);
    }

    #[test]
    fn sse_replaces_invalid_utf8_instead_of_failing() {
        let body = b"data: ok\ndata: bad\xFF\xFEtail\n";
        let chunks = collect_sse(body);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "ok");
        assert!(chunks[1].starts_with("bad"));
        assert!(chunks[1].ends_with("tail"));
    }

    #[test]
    fn sse_handles_missing_trailing_newline() {
        let body = b"data: first\ndata: last";
        assert_eq!(collect_sse(body), vec!["first", "last"]);
    }

    #[test]
    fn answer_parsing_tolerates_missing_and_null() {
        assert_eq!(parse_answer(r#"{"answer":"42"}"#).unwrap(), "42");
        assert_eq!(parse_answer(r#"{}"#).unwrap(), "");
        assert_eq!(parse_answer(r#"{"answer":null}"#).unwrap(), "");
        assert!(parse_answer("not json").is_err());
    }

    #[test]
    fn text_payload_serializes_to_expected_shape() {
        let value = serde_json::to_value(TextPayload { text: "2+2?" }).unwrap();
        assert_eq!(value, serde_json::json!({ "text": "2+2?" }));
    }

    #[test]
    fn image_payload_carries_base64_and_question() {
        let payload = ImagePayload {
            question: "what is shown?",
            image: general_purpose::STANDARD.encode(b"\x01\x02\x03"),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["question"], "what is shown?");
        assert_eq!(value["image"], "AQID");
    }

    #[test]
    fn base_url_is_normalized() {
        let client = BackendClient::new("http://localhost:8080///").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        let plain = BackendClient::new("http://h:1").unwrap();
        assert_eq!(plain.base_url(), "http://h:1");
    }
}
