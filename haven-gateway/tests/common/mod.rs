//! Shared helpers for integration tests.
//!
//! Every test binds real servers on `127.0.0.1:0`: a fake upstream standing
//! in for DashScope or Gemini, and the gateway router itself.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use haven_gateway::providers::{CompletionProvider, DashScopeClient};
use haven_gateway::server::create_router;
use haven_gateway::state::GatewayState;
use serde_json::{Value, json};

pub const TEST_KEY: &str = "test-upstream-key";

/// How the fake upstream answers every request.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Behavior {
    /// 200 with a DashScope-shaped reply
    Reply(String),
    /// The given status and JSON body
    Status(u16, Value),
    /// Sleep, then reply
    Hang(Duration),
    /// 200 with a raw Gemini `generateContent` body
    Gemini(Value),
}

/// A request as the fake upstream saw it.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct Upstream {
    behavior: Behavior,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

/// Running fake upstream
#[allow(dead_code)]
pub struct FakeUpstream {
    pub base_url: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

#[allow(dead_code)]
impl FakeUpstream {
    /// URL of the DashScope-style generation endpoint.
    pub fn generation_url(&self) -> String {
        format!("{}/generation", self.base_url)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}")
}

/// Start a fake upstream that answers every POST with `behavior`.
pub async fn spawn_upstream(behavior: Behavior) -> FakeUpstream {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let upstream = Upstream {
        behavior,
        recorded: recorded.clone(),
    };

    let router = Router::new()
        .route("/generation", post(upstream_handler))
        .route("/models/{*rest}", post(upstream_handler))
        .with_state(upstream);

    FakeUpstream {
        base_url: serve(router).await,
        recorded,
    }
}

async fn upstream_handler(
    State(upstream): State<Upstream>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    upstream.recorded.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        authorization: header("authorization"),
        api_key: header("x-goog-api-key"),
        body,
    });

    match upstream.behavior {
        Behavior::Reply(text) => Json(dashscope_reply(&text)).into_response(),
        Behavior::Status(status, body) => {
            let status = StatusCode::from_u16(status).expect("valid status");
            (status, Json(body)).into_response()
        }
        Behavior::Hang(delay) => {
            tokio::time::sleep(delay).await;
            Json(dashscope_reply("too late")).into_response()
        }
        Behavior::Gemini(body) => Json(body).into_response(),
    }
}

fn dashscope_reply(text: &str) -> Value {
    json!({
        "output": {
            "choices": [{
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": text}
            }]
        },
        "request_id": "req-test"
    })
}

/// Start the gateway. `upstream_url = None` simulates a missing credential.
pub async fn spawn_gateway(upstream_url: Option<&str>, timeout: Duration) -> String {
    let upstream = upstream_url.map(|url| {
        Arc::new(DashScopeClient::new(TEST_KEY, url)) as Arc<dyn CompletionProvider>
    });
    let state = Arc::new(GatewayState::new(upstream, "qwen-turbo", timeout));
    serve(create_router(state)).await
}
