use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::Config;

// Everything except unreserved characters and '/' is escaped, the same set
// urllib.parse.quote uses, since the prompt travels as a URL path segment.
const PROMPT_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Outcome of one completion fetch. The chat handler maps every non-Text
/// variant to a conversational reply; none of them become an HTTP error.
#[derive(Debug)]
pub enum Completion {
    Text(String),
    Timeout,
    UpstreamError(u16),
    Transport(String),
}

pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CompletionClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        CompletionClient {
            http,
            base_url: config.completion_url.trim_end_matches('/').to_string(),
            timeout: config.completion_timeout,
        }
    }

    /// Sends the prompt as a GET with the prompt percent-encoded into the
    /// path. The response body is raw completion text, not JSON.
    pub async fn complete(&self, prompt: &str) -> Completion {
        let encoded = utf8_percent_encode(prompt, PROMPT_ESCAPE);
        let url = format!("{}/{}", self.base_url, encoded);
        log::debug!("Calling completion endpoint: {:.50}...", url);

        let response = match self.http.get(&url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Completion::Timeout,
            Err(e) => return Completion::Transport(e.to_string()),
        };

        let status = response.status();
        log::debug!("Completion response status: {}", status);
        if status != reqwest::StatusCode::OK {
            return Completion::UpstreamError(status.as_u16());
        }

        match response.text().await {
            Ok(text) => Completion::Text(text),
            Err(e) if e.is_timeout() => Completion::Timeout,
            Err(e) => Completion::Transport(e.to_string()),
        }
    }
}
