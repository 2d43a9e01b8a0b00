//! テスト用のバックエンドサーバー
//!
//! ループバック上でhyperサーバーを起動し、登録したレスポンスを返す。
//! 受信したリクエストは記録され、テストから検証できる。
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// 登録済みレスポンス
#[derive(Debug, Clone)]
struct CannedResponse {
    status: u16,
    body: String,
    delay: Duration,
}

/// 受信したリクエスト
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct ServerState {
    routes: HashMap<(String, String), CannedResponse>,
    requests: Vec<RecordedRequest>,
}

/// テスト用サーバー
pub struct TestServer {
    base_url: String,
    state: Arc<Mutex<ServerState>>,
}

impl TestServer {
    /// サーバーを起動する
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(ServerState::default()));

        let server_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&server_state);
                tokio::spawn(async move {
                    let service = service_fn(move |req| handle(req, Arc::clone(&state)));
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// ベースURL
    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    /// レスポンスを登録する
    pub fn respond(&self, method: &str, path: &str, status: u16, body: impl Into<String>) {
        self.respond_delayed(method, path, status, body, Duration::ZERO);
    }

    /// 遅延付きでレスポンスを登録する
    pub fn respond_delayed(
        &self,
        method: &str,
        path: &str,
        status: u16,
        body: impl Into<String>,
        delay: Duration,
    ) {
        self.state.lock().unwrap().routes.insert(
            (method.to_string(), path.to_string()),
            CannedResponse {
                status,
                body: body.into(),
                delay,
            },
        );
    }

    /// 受信したリクエスト一覧
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<Mutex<ServerState>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };
    let authorization = header("authorization");
    let content_type = header("content-type");

    let body = match req.into_body().collect().await {
        Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).to_string(),
        Err(_) => String::new(),
    };

    let canned = {
        let mut state = state.lock().unwrap();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            query,
            authorization,
            content_type,
            body,
        });
        state.routes.get(&(method, path)).cloned()
    };

    let canned = canned.unwrap_or(CannedResponse {
        status: 404,
        body: "Not Found".to_string(),
        delay: Duration::ZERO,
    });

    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }

    let response = Response::builder()
        .status(StatusCode::from_u16(canned.status).unwrap())
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(canned.body)))
        .unwrap();
    Ok(response)
}
