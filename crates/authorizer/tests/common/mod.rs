//! In-process HTTP server recording every request it receives
//!
//! - `/status/{code}` answers with `code`
//! - `/secure-basic/..` expects `bob:s3cret` as basic credentials
//! - `/secure-digest/..` expects any digest credentials
//! - everything else answers `200 OK`
#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const BASIC_CREDENTIALS: &str = "Basic Ym9iOnMzY3JldA==";
pub const DIGEST_CHALLENGE: &str =
    r#"Digest realm="test", qop="auth", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c""#;

#[derive(Debug, Clone)]
pub struct Received {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Received {
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn form(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(&self.body)
            .into_owned()
            .collect()
    }
}

type Log = Arc<Mutex<Vec<Received>>>;

pub struct MockServer {
    address: SocketAddr,
    received: Log,
}

impl MockServer {
    pub fn start() -> Self {
        let received = Log::default();
        let state = received.clone();
        let (sender, receiver) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("test runtime");

            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind mock server");
                sender
                    .send(listener.local_addr().expect("local address"))
                    .expect("report address");

                let app = Router::new().fallback(respond).with_state(state);
                axum::serve(listener, app).await.expect("serve");
            });
        });

        let address = receiver.recv().expect("mock server address");
        Self { address, received }
    }

    /// Base url without a trailing slash, e.g. `http://127.0.0.1:4711`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().expect("request log").clone()
    }
}

async fn respond(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    log.lock().expect("request log").push(Received {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: body.to_vec(),
    });

    let path = uri.path();

    if let Some(code) = path.strip_prefix("/status/") {
        return code
            .parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::BAD_REQUEST)
            .into_response();
    }

    if path.starts_with("/secure-basic/") {
        return match authorization.as_deref() {
            Some(BASIC_CREDENTIALS) => StatusCode::OK.into_response(),
            _ => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, r#"Basic realm="test""#)],
            )
                .into_response(),
        };
    }

    if path.starts_with("/secure-digest/") {
        return match authorization.as_deref() {
            Some(credentials) if credentials.starts_with("Digest ") => {
                StatusCode::OK.into_response()
            }
            _ => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, DIGEST_CHALLENGE)],
            )
                .into_response(),
        };
    }

    StatusCode::OK.into_response()
}
