//! Client for the answer service's chat-completion endpoint. Each attempt
//! runs under a hard timeout; timed-out attempts are retried with
//! exponential backoff, while transport failures and error statuses fail
//! the call immediately.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Low sampling temperature keeps the output close to the JSON shape the
/// system prompt demands.
const TEMPERATURE: f64 = 0.2;

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
}

/// Backoff before retry number `attempt` (zero-based): 1s, 2s, 4s, ...
pub fn retry_delay(attempt: u32) -> Duration {
    INITIAL_RETRY_DELAY * 2u32.pow(attempt)
}

/// Sends the prompt pair to the answer service and returns the raw text of
/// its single choice. Retries apply to timeouts only; the retry cap and the
/// per-attempt bound come from configuration.
pub async fn query_answer_service(
    client: &Client,
    config: &Config,
    system_prompt: &str,
    user_message: &str,
) -> Result<String> {
    let mut attempt = 0u32;
    loop {
        let call = send_chat(client, config, system_prompt, user_message);
        match timeout(config.upstream_timeout, call).await {
            Ok(result) => return result,
            Err(_) if attempt < config.upstream_retries => {
                let delay = retry_delay(attempt);
                warn!(attempt, delay_secs = delay.as_secs(), "answer service attempt timed out, retrying");
                sleep(delay).await;
                attempt += 1;
            }
            Err(_) => {
                return Err(AppError::Timeout {
                    secs: config.upstream_timeout.as_secs(),
                })
            }
        }
    }
}

async fn send_chat(
    client: &Client,
    config: &Config,
    system_prompt: &str,
    user_message: &str,
) -> Result<String> {
    let body = ChatRequest {
        model: config.answer_model.clone(),
        messages: vec![
            Message {
                role: "system".into(),
                content: system_prompt.into(),
            },
            Message {
                role: "user".into(),
                content: user_message.into(),
            },
        ],
        temperature: TEMPERATURE,
    };

    debug!(model = %config.answer_model, "calling answer service");

    let response = client
        .post(&config.answer_api_url)
        .bearer_auth(&config.answer_api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| AppError::Upstream {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            body: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let json: serde_json::Value = response.json().await.map_err(|e| AppError::Upstream {
        status: status.as_u16(),
        body: e.to_string(),
    })?;

    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AppError::Upstream {
            status: status.as_u16(),
            body: "response contained no message content".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn test_config(url: &str) -> Config {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            answer_api_key: "test-key".to_string(),
            answer_api_url: url.to_string(),
            answer_model: "sonar".to_string(),
            identity_url: String::new(),
            quota_url: String::new(),
            service_key: String::new(),
            upstream_timeout: Duration::from_secs(1),
            upstream_retries: 2,
        }
    }

    /// Reads one HTTP request off the socket, headers plus body.
    async fn read_request(socket: &mut TcpStream) -> bool {
        let mut buf = vec![0u8; 8192];
        let mut read = 0;
        loop {
            if let Some(pos) = buf[..read].windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..pos]).to_ascii_lowercase();
                let body_len = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if read >= pos + 4 + body_len {
                    return true;
                }
            }
            match socket.read(&mut buf[read..]).await {
                Ok(0) | Err(_) => return false,
                Ok(n) => read += n,
            }
        }
    }

    fn chat_response(content: &str) -> String {
        let body = serde_json::json!({
            "choices": [{"message": {"content": content}}]
        })
        .to_string();
        format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    #[test]
    fn backoff_schedule_doubles_from_one_second() {
        assert_eq!(retry_delay(0), Duration::from_secs(1));
        assert_eq!(retry_delay(1), Duration::from_secs(2));
        assert_eq!(retry_delay(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn transport_failure_is_upstream_error_not_timeout() {
        // Nothing listens on this port, so the connection is refused fast
        // enough to stay under the attempt timeout.
        let client = Client::new();
        let config = test_config("http://127.0.0.1:9/chat/completions");
        let err = query_answer_service(&client, &config, "system", "user")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "upstream");
    }

    #[tokio::test]
    async fn timeout_twice_then_third_attempt_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let seen = connections.clone();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let attempt = seen.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    if attempt < 2 {
                        // Hold the connection open past the attempt timeout
                        // without ever answering.
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        return;
                    }
                    if read_request(&mut socket).await {
                        let response = chat_response(r#"{"name": "iPhone 15"}"#);
                        let _ = socket.write_all(response.as_bytes()).await;
                    }
                });
            }
        });

        let client = Client::new();
        let config = test_config(&format!("http://{}/chat/completions", addr));

        let start = std::time::Instant::now();
        let content = query_answer_service(&client, &config, "system", "user")
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(content, r#"{"name": "iPhone 15"}"#);
        assert_eq!(connections.load(Ordering::SeqCst), 3);
        // Two 1 s attempt timeouts plus the 1 s and 2 s backoffs.
        assert!(elapsed >= Duration::from_secs(5), "elapsed {:?}", elapsed);
    }
}
