//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

type Reply = Result<ApiResponse, TransportError>;

/// Replays queued replies in order and records every request it saw.
///
/// Clones share the same script and log.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    seen: Arc<Mutex<Vec<ApiRequest>>>,
    hang: Arc<Mutex<bool>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push(Ok(ApiResponse::new(status, body.to_string())))
    }

    pub fn reply_text(&self, status: u16, body: &str) -> &Self {
        self.push(Ok(ApiResponse::new(status, body)))
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.push(Err(error))
    }

    /// Never resolve the next request.
    pub fn hang(&self) {
        *self.hang.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    fn push(&self, reply: Reply) -> &Self {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> ApiRequest {
        self.requests().pop().unwrap()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait::async_trait(?Send)]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).push(request);
        let hang = *self.hang.lock().unwrap_or_else(PoisonError::into_inner);
        if hang {
            futures::future::pending::<()>().await;
        }
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Unreachable("no scripted reply".to_owned())))
    }
}

pub fn identity_json(username: &str) -> serde_json::Value {
    serde_json::json!({
        "id": 7,
        "username": username,
        "email": format!("{username}@example.com"),
        "firstName": "Alice",
        "lastName": "Liddell",
        "role": "ROLE_USER",
        "enabled": true
    })
}
