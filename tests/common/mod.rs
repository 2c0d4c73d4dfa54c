#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use obi_energy_tracker::api::{self, Endpoints, ObiApi};
use obi_energy_tracker::model::{Bridge, Credentials};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const ACCOUNT_ID: &str = "acc-1234";
pub const BRIDGE_ID: &str = "bridge-4711";
pub const DEVICE_ID: &str = "sensor-0815";

/// Status used by routes that close the connection without answering.
pub const HANG_UP: u16 = 0;

pub fn read_resource(filename: &str) -> String {
    let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    d.push(format!("resources/test/{}", filename));
    fs::read_to_string(d.as_path()).unwrap()
}

pub fn token(claims: &str) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims)
    )
}

pub fn login_body() -> String {
    format!(
        r#"{{"token":"{}"}}"#,
        token(&format!(r#"{{"accountId":"{}"}}"#, ACCOUNT_ID))
    )
}

pub fn credentials() -> Credentials {
    Credentials {
        email: "jane@example.com".into(),
        password: "secret".into(),
        country: "DE".into(),
    }
}

pub fn bridge() -> Bridge {
    Bridge {
        bridge_id: BRIDGE_ID.into(),
        device_id: DEVICE_ID.into(),
    }
}

pub fn users_path() -> String {
    format!("/users/{}", ACCOUNT_ID)
}

pub fn total_path() -> String {
    format!("/historical-data/{}/total", BRIDGE_ID)
}

pub fn hourly_path() -> String {
    format!("/historical-data/{}/{}/hourly", BRIDGE_ID, DEVICE_ID)
}

pub fn meter_path() -> String {
    format!("/historical-data/{}/{}/meter", BRIDGE_ID, DEVICE_ID)
}

#[derive(Debug, Clone)]
struct Route {
    method: String,
    path: String,
    query: Option<(String, String)>,
    status: u16,
    body: String,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Minimal HTTP/1.1 server answering canned responses and recording every request.
pub struct StubServer {
    pub url: String,
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: JoinHandle<()>,
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl StubServer {
    pub async fn start() -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let routes = Arc::new(Mutex::new(Vec::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let routes = routes.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let routes = routes.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let _ = serve(stream, routes, requests).await;
                    });
                }
            })
        };

        StubServer {
            url,
            routes,
            requests,
            handle,
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            login_url: format!("{}/login", self.url),
            api_url: self.url.clone(),
        }
    }

    pub fn route(&self, method: &str, path: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().push(Route {
            method: method.into(),
            path: path.into(),
            query: None,
            status,
            body: body.into(),
        });
    }

    /// Route only matching requests carrying query parameter `key=value`.
    pub fn route_query(&self, path: &str, key: &str, value: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().push(Route {
            method: "GET".into(),
            path: path.into(),
            query: Some((key.into(), value.into())),
            status,
            body: body.into(),
        });
    }

    pub fn clear_routes(&self) {
        self.routes.lock().unwrap().clear();
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Answer login and user lookup like the vendor does for a healthy account.
    pub fn route_account(&self) {
        self.route("POST", "/login", 200, &login_body());
        self.route("GET", &users_path(), 200, &read_resource("user.json"));
    }

    /// Client pointed at this server.
    pub fn api(&self, known_bridge: Option<Bridge>) -> ObiApi {
        api::api(credentials(), known_bridge, self.endpoints()).unwrap()
    }
}

fn header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

async fn serve(
    mut stream: TcpStream,
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_len = loop {
        if let Some(end) = header_end(&buffer) {
            break end;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..head_len]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let mut parts = request_line.split(' ');
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buffer.len() < head_len + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buffer[head_len..]).to_string();

    let url = reqwest::Url::parse(&format!("http://stub{}", target)).unwrap();
    let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
    let path = url.path().to_string();

    requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: query.clone(),
        headers,
        body,
    });

    let route = routes
        .lock()
        .unwrap()
        .iter()
        .find(|route| {
            route.method == method
                && route.path == path
                && route
                    .query
                    .as_ref()
                    .map(|(k, v)| query.get(k) == Some(v))
                    .unwrap_or(true)
        })
        .cloned();

    let (status, body) = match route {
        Some(route) if route.status == HANG_UP => return stream.shutdown().await,
        Some(route) => (route.status, route.body),
        None => (404, String::from(r#"{"message":"not found"}"#)),
    };

    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
