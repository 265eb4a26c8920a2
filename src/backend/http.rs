use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use super::{
    Backend, EventRequest, EventResponse, GreetingResponse, MessageRequest, MessageResponse, NewGameResponse,
};

/// JSON-over-HTTP backend. `base` is the API root, e.g. `http://localhost:8000/api`.
pub struct HttpBackend {
    agent: ureq::Agent,
    base: String,
}

impl HttpBackend {
    pub fn new(base: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        HttpBackend {
            agent,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }
}

impl Backend for HttpBackend {
    fn new_game(&self) -> Result<NewGameResponse> {
        let url = self.url("new_game");
        debug!(%url, "POST");
        self.agent
            .post(&url)
            .call()
            .with_context(|| format!("POST {}", url))?
            .into_json()
            .context("decoding new_game response")
    }

    fn haven_greeting(&self, session_id: &str) -> Result<GreetingResponse> {
        let url = self.url("haven_greeting");
        debug!(%url, "POST");
        self.agent
            .post(&url)
            .query("session_id", session_id)
            .call()
            .with_context(|| format!("POST {}", url))?
            .into_json()
            .context("decoding haven_greeting response")
    }

    fn event(&self, request: &EventRequest) -> Result<EventResponse> {
        let url = self.url("event");
        debug!(%url, event = %request.event, "POST");
        self.agent
            .post(&url)
            .send_json(request)
            .with_context(|| format!("POST {}", url))?
            .into_json()
            .context("decoding event response")
    }

    fn message(&self, request: &MessageRequest) -> Result<MessageResponse> {
        let url = self.url("message");
        debug!(%url, "POST");
        self.agent
            .post(&url)
            .send_json(request)
            .with_context(|| format!("POST {}", url))?
            .into_json()
            .context("decoding message response")
    }
}
