//! AI chat relay (`POST /api/v1/chat`)

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Config, Network};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub account_address: String,
    pub message: String,
    pub network: String,
}

impl ChatRequest {
    pub fn new(account_address: impl Into<String>, message: impl Into<String>, network: Network) -> Self {
        Self {
            account_address: account_address.into(),
            message: message.into(),
            network: network.to_string(),
        }
    }
}

/// The relay answers with a bare string or with `{"response": "..."}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatReply {
    Text(String),
    Object(Value),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("chat relay returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("chat relay unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected chat reply: {0}")]
    Decode(String),
}

pub struct ChatClient {
    http_client: Client,
    url: String,
    log_requests: bool,
}

impl ChatClient {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        let http_client = Client::builder().timeout(config.api_timeout()).build()?;
        Ok(Self {
            http_client,
            url: format!("{}/api/v1/chat", config.effective_chat_url().trim_end_matches('/')),
            log_requests: config.enable_api_logging,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn send_message(&self, request: &ChatRequest) -> Result<String, ChatError> {
        if request.message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        if self.log_requests {
            info!("POST {} ({} chars, network {})", self.url, request.message.len(), request.network);
        } else {
            debug!("POST {}", self.url);
        }

        let response = self.http_client.post(&self.url).json(request).send().await?;
        let status = response.status();

        if self.log_requests {
            info!("Chat relay responded {}", status);
        }

        let body = response.text().await?;
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("request failed");
            return Err(ChatError::Http {
                status: status.as_u16(),
                message: error_message(&body, reason),
            });
        }

        parse_reply(&body)
    }
}

/// `message`, then `error`, then the HTTP reason
fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback.to_string())
}

fn parse_reply(body: &str) -> Result<String, ChatError> {
    let reply: ChatReply =
        serde_json::from_str(body).map_err(|e| ChatError::Decode(e.to_string()))?;

    Ok(match reply {
        ChatReply::Text(text) => text,
        ChatReply::Object(value) => match value.get("response").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => value.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest::new("0xabc", "how is my vault?", Network::Testnet);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["account_address"], "0xabc");
        assert_eq!(json["message"], "how is my vault?");
        assert_eq!(json["network"], "testnet");
    }

    #[test]
    fn test_reply_forms() {
        assert_eq!(parse_reply(r#""plain answer""#).unwrap(), "plain answer");
        assert_eq!(parse_reply(r#"{"response":"wrapped"}"#).unwrap(), "wrapped");
        assert_eq!(parse_reply(r#"{"other":1}"#).unwrap(), r#"{"other":1}"#);
        assert!(parse_reply("not json").is_err());
    }

    #[test]
    fn test_error_message_precedence() {
        assert_eq!(error_message(r#"{"message":"m","error":"e"}"#, "Bad"), "m");
        assert_eq!(error_message(r#"{"error":"e"}"#, "Bad"), "e");
        assert_eq!(error_message("<html>", "Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_empty_message_rejected_locally() {
        let client = ChatClient::new(&Config::default()).unwrap();
        assert_eq!(client.url(), "https://manixai.eaglefi.io/api/v1/chat");

        let request = ChatRequest::new("0xabc", "   ", Network::Mainnet);
        assert!(matches!(client.send_message(&request).await, Err(ChatError::EmptyMessage)));
    }
}
