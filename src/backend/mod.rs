//! Client side of the game backend: wire types, the `Backend` seam, the HTTP
//! implementation, and the worker that runs calls off the UI thread.

pub mod http;
pub mod worker;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};

use crate::ending::EndingKind;
use crate::state::Flags;

pub use http::HttpBackend;
pub use worker::Worker;

#[derive(Debug, Clone, Deserialize)]
pub struct NewGameResponse {
    pub session_id: String,
    #[serde(deserialize_with = "bool_flags")]
    pub flags: Flags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GreetingResponse {
    pub haven_response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRequest {
    pub session_id: String,
    pub event: String,
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventResponse {
    #[serde(deserialize_with = "bool_flags")]
    pub flags: Flags,
    pub phase: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRequest {
    pub session_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(deserialize_with = "bool_flags")]
    pub flags: Flags,
    pub phase: u32,
    pub haven_response: String,
    pub game_over: bool,
    #[serde(default)]
    pub ending: Option<EndingKind>,
}

/// The backend sends its whole session record as `flags`; only the boolean
/// entries are flags.
fn bool_flags<'de, D>(deserializer: D) -> Result<Flags, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| value.as_bool().map(|set| (name, set)))
        .collect())
}

pub trait Backend: Send + Sync {
    fn new_game(&self) -> Result<NewGameResponse>;
    fn haven_greeting(&self, session_id: &str) -> Result<GreetingResponse>;
    fn event(&self, request: &EventRequest) -> Result<EventResponse>;
    fn message(&self, request: &MessageRequest) -> Result<MessageResponse>;
}

/// A call queued by the game for the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    NewGame,
    Greeting { session_id: String },
    Event(EventRequest),
    Message(MessageRequest),
}

/// Outcome of a [`Request`], delivered back to the UI thread.
#[derive(Debug)]
pub enum Reply {
    NewGame(Result<NewGameResponse>),
    Greeting(Result<GreetingResponse>),
    Event(Result<EventResponse>),
    Message(Result<MessageResponse>),
}

pub fn execute(backend: &dyn Backend, request: Request) -> Reply {
    match request {
        Request::NewGame => Reply::NewGame(backend.new_game()),
        Request::Greeting { session_id } => Reply::Greeting(backend.haven_greeting(&session_id)),
        Request::Event(req) => Reply::Event(backend.event(&req)),
        Request::Message(req) => Reply::Message(backend.message(&req)),
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    /// Scripted backend for controller tests.
    #[derive(Default)]
    pub struct FakeBackend {
        pub session_id: String,
        pub flags: Flags,
        pub fail_all: bool,
        pub new_game_delay: Duration,
        pub message_reply: Mutex<Option<MessageResponse>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            FakeBackend {
                session_id: "fake-session".into(),
                ..Default::default()
            }
        }

        fn record(&self, call: &str) -> Result<()> {
            self.calls.lock().unwrap().push(call.to_string());
            if self.fail_all {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }
    }

    impl Backend for FakeBackend {
        fn new_game(&self) -> Result<NewGameResponse> {
            thread::sleep(self.new_game_delay);
            self.record("new_game")?;
            Ok(NewGameResponse {
                session_id: self.session_id.clone(),
                flags: self.flags.clone(),
            })
        }

        fn haven_greeting(&self, _session_id: &str) -> Result<GreetingResponse> {
            self.record("haven_greeting")?;
            Ok(GreetingResponse {
                haven_response: "Good morning, Resident.".into(),
            })
        }

        fn event(&self, request: &EventRequest) -> Result<EventResponse> {
            self.record(&format!("event:{}", request.event))?;
            let mut flags = self.flags.clone();
            flags.insert("sensors_dead_discovered".into(), true);
            Ok(EventResponse { flags, phase: 2 })
        }

        fn message(&self, request: &MessageRequest) -> Result<MessageResponse> {
            self.record(&format!("message:{}", request.text))?;
            let scripted = self.message_reply.lock().unwrap().clone();
            Ok(scripted.unwrap_or(MessageResponse {
                flags: self.flags.clone(),
                phase: 1,
                haven_response: "I am monitoring the situation.".into(),
                game_over: false,
                ending: None,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeBackend;
    use super::*;

    #[test]
    fn message_response_drops_non_bool_flags() {
        let body = r#"{
            "haven_response": "Safe.",
            "intent": "agree_to_stay",
            "flags": {
                "game_started": true,
                "ai_concedes": false,
                "ending": "compliance",
                "current_room": "living_quarters",
                "conversation_history": []
            },
            "phase": 3,
            "game_over": true,
            "ending": "compliance"
        }"#;
        let response: MessageResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.flags.len(), 2);
        assert_eq!(response.flags.get("game_started"), Some(&true));
        assert_eq!(response.ending, Some(EndingKind::Compliance));
    }

    #[test]
    fn null_ending_means_no_ending() {
        let body = r#"{"haven_response":"x","flags":{},"phase":1,"game_over":false,"ending":null}"#;
        let response: MessageResponse = serde_json::from_str(body).unwrap();
        assert!(response.ending.is_none());
    }

    #[test]
    fn event_request_wire_shape() {
        let request = EventRequest {
            session_id: "abc".into(),
            event: "view_sensor_logs".into(),
            room: "control_room".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"session_id": "abc", "event": "view_sensor_logs", "room": "control_room"})
        );
    }

    #[test]
    fn execute_routes_to_matching_call() {
        let backend = FakeBackend::new();
        let reply = execute(
            &backend,
            Request::Event(EventRequest {
                session_id: "fake-session".into(),
                event: "view_sensor_logs".into(),
                room: "control_room".into(),
            }),
        );
        match reply {
            Reply::Event(Ok(response)) => assert_eq!(response.phase, 2),
            other => panic!("unexpected reply {:?}", other),
        }
        assert_eq!(backend.calls.lock().unwrap().as_slice(), ["event:view_sensor_logs"]);
    }
}
