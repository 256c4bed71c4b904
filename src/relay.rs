use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::logging::{LogEntry, LogLevel, SharedLogger};
use crate::translate::types::{ErrorResponse, UpstreamChatRequest};

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;

/// Raw response body chunks, forwarded in upstream arrival order.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Outcome of forwarding a chat completion.
pub enum ChatRelay {
    /// Buffered upstream JSON, relayed verbatim.
    Buffered(serde_json::Value),
    /// Incremental upstream body for `stream: true` requests.
    Streaming(ByteStream),
    /// Upstream answered non-2xx; status code preserved for the client.
    Error(ErrorResponse, u16),
}

/// Outcome of forwarding a models listing.
pub enum ModelsRelay {
    Success(serde_json::Value),
    Error(ErrorResponse, u16),
}

/// Forward a resolved chat request upstream with the caller's credential.
///
/// Makes exactly one upstream call. The `stream` field of the resolved
/// request decides whether the response body is buffered or relayed
/// incrementally; either way the upstream status is checked first.
pub async fn relay_chat(
    req: &UpstreamChatRequest,
    credential: &str,
    config: &RelayConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
    request_id: &str,
) -> Result<ChatRelay> {
    let url = format!("{}/chat/completions", config.upstream_base());

    logger.log(
        LogEntry::new(
            LogLevel::Info,
            "chat",
            format!("POST {} model={} stream={}", url, req.model, req.stream),
        )
        .with_request(request_id),
    );

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {credential}"))
        .header("Content-Type", "application/json")
        .json(req)
        .send()
        .await
        .map_err(|e| RelayError::upstream(format!("Request failed: {e}")))?;

    let status = response.status().as_u16();

    if !(200..300).contains(&status) {
        let body = response.text().await.unwrap_or_default();
        logger.log(
            LogEntry::new(
                LogLevel::Warn,
                "chat",
                format!("Upstream status={}: {}", status, truncate(&body, 300)),
            )
            .with_request(request_id),
        );
        let err = ErrorResponse::new(format!("upstream error {status}: {body}"));
        return Ok(ChatRelay::Error(err, status));
    }

    if req.stream {
        let byte_stream = response.bytes_stream();
        let relayed = forward_byte_stream(byte_stream, logger.clone(), request_id.to_string());
        return Ok(ChatRelay::Streaming(Box::pin(relayed)));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| RelayError::upstream(format!("Failed to read response body: {e}")))?;

    logger.log(
        LogEntry::new(LogLevel::Info, "chat", "Completed")
            .with_request(request_id),
    );

    Ok(ChatRelay::Buffered(body))
}

/// Relay the upstream body chunk-for-chunk.
///
/// No buffering, parsing, or reframing: a chunk goes out exactly as it came
/// in. The upstream response is owned by this stream, so dropping it (client
/// disconnect included) releases the upstream connection.
fn forward_byte_stream(
    byte_stream: impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
    logger: SharedLogger,
    request_id: String,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    async_stream::stream! {
        let mut chunks: u64 = 0;
        let mut bytes: u64 = 0;

        tokio::pin!(byte_stream);

        while let Some(next) = byte_stream.next().await {
            match next {
                Ok(chunk) => {
                    chunks += 1;
                    bytes += chunk.len() as u64;
                    yield Ok(chunk);
                }
                Err(e) => {
                    logger.log(
                        LogEntry::new(
                            LogLevel::Error,
                            "stream",
                            format!("Upstream read failed: {e}"),
                        )
                        .with_request(&request_id),
                    );
                    yield Err(std::io::Error::other(e));
                    break;
                }
            }
        }

        logger.log(
            LogEntry::new(
                LogLevel::Info,
                "stream",
                format!("Stream closed chunks={chunks} bytes={bytes}"),
            )
            .with_request(&request_id),
        );
    }
}

/// Forward a models listing with the caller's credential.
pub async fn relay_models(
    credential: &str,
    config: &RelayConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<ModelsRelay> {
    let url = format!("{}/models", config.upstream_base());

    logger.info("models", format!("GET {url}"));

    let response = client
        .get(&url)
        .header("Authorization", format!("Bearer {credential}"))
        .send()
        .await
        .map_err(|e| RelayError::upstream(format!("Request failed: {e}")))?;

    let status = response.status().as_u16();

    if !(200..300).contains(&status) {
        logger.warn("models", format!("Upstream status={status}"));
        let err = ErrorResponse::new("failed to fetch models");
        return Ok(ModelsRelay::Error(err, status));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| RelayError::upstream(format!("Failed to read models response: {e}")))?;

    Ok(ModelsRelay::Success(body))
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        &s[..max]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_forward_byte_stream_preserves_chunks() {
        let chunks: Vec<std::result::Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Ok(Bytes::from_static(b"data: two\n\n")),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ];

        let logger = SharedLogger::in_memory();
        let relayed: Vec<_> =
            forward_byte_stream(stream::iter(chunks), logger.clone(), "req-1".to_string())
                .collect()
                .await;

        assert_eq!(relayed.len(), 3);
        assert_eq!(relayed[0].as_ref().unwrap(), &Bytes::from_static(b"data: one\n\n"));
        assert_eq!(relayed[2].as_ref().unwrap(), &Bytes::from_static(b"data: [DONE]\n\n"));

        let recent = logger.recent(1);
        assert!(recent[0].message.contains("chunks=3"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("0123456789abc", 10), "0123456789");
    }
}
