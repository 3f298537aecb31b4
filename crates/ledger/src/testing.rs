//! Scripted in-memory transport for unit tests.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use reqwest::Method;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    client::{ApiClient, ApiRequest, ApiResponse, Transport, TransportError},
    navigation::{Navigator, Route},
    session::{MemoryCredentialStore, Session},
};

enum Reply {
    Answer(ApiResponse),
    Fail,
}

#[derive(Default)]
struct Script {
    routes: HashMap<(Method, String), VecDeque<Reply>>,
    requests: Vec<ApiRequest>,
}

/// Answers requests from per-route queues. The last queued reply of a
/// route is sticky; unknown routes answer 404.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Replaces whatever the route would have answered.
    pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.set(method, path, Reply::Answer(answer(status, body)));
    }

    /// Appends a reply after the ones already queued for the route.
    pub(crate) fn enqueue(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        let mut script = self.inner.lock().unwrap();
        script
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(Reply::Answer(answer(status, body)));
    }

    pub(crate) fn fail(&self, method: Method, path: &str) {
        self.set(method, path, Reply::Fail);
    }

    fn set(&self, method: Method, path: &str, reply: Reply) {
        let mut script = self.inner.lock().unwrap();
        script
            .routes
            .insert((method, path.to_string()), VecDeque::from([reply]));
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub(crate) fn count(&self, method: &Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|req| &req.method == method && req.path == path)
            .count()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut script = self.inner.lock().unwrap();
        let key = (request.method.clone(), request.path.clone());
        script.requests.push(request);

        let Some(queue) = script.routes.get_mut(&key) else {
            return Ok(ApiResponse::new(404, r#"{"message":"no route"}"#));
        };
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().map(|reply| match reply {
                Reply::Answer(res) => Reply::Answer(res.clone()),
                Reply::Fail => Reply::Fail,
            })
        };
        match reply {
            Some(Reply::Answer(res)) => Ok(res),
            Some(Reply::Fail) => Err(TransportError("connection refused".to_string())),
            None => Ok(ApiResponse::new(404, r#"{"message":"no route"}"#)),
        }
    }
}

fn answer(status: u16, body: serde_json::Value) -> ApiResponse {
    ApiResponse::new(status, body.to_string())
}

pub(crate) fn client(
    token: Option<&str>,
) -> (
    ApiClient<ScriptedTransport>,
    ScriptedTransport,
    UnboundedReceiver<Route>,
) {
    let (navigator, rx) = Navigator::channel();
    let store = match token {
        Some(token) => MemoryCredentialStore::with_value(token),
        None => MemoryCredentialStore::default(),
    };
    let transport = ScriptedTransport::default();
    let api = ApiClient::new(transport.clone(), Session::new(store, navigator));
    (api, transport, rx)
}
