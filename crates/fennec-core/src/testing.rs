use std::net::SocketAddr;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request};
use tokio::net::TcpListener;
use tower::ServiceExt;

use crate::app::Fennec;
use crate::dispatch::Responder;

/// A running test server.
///
/// Serves a router on an OS-assigned port for integration tests.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_get_user() {
///     let server = TestServer::from_app(Fennec::new(services).endpoint::<GetUser>()).await;
///     let res = server.client.get(&server.url("/users/1")).await;
///     assert_eq!(res.status, 200);
/// }
/// ```
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: TestClient,
}

impl TestServer {
    /// Serve `router` on `127.0.0.1:0`.
    pub async fn new(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestServer {
            addr,
            client: TestClient::new(addr),
        }
    }

    /// Build `app` and serve it.
    pub async fn from_app(app: Fennec) -> Self {
        let router = app.into_router().expect("Failed to build test app");
        Self::new(router).await
    }

    /// Get the full URL for a path on the test server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// A simple HTTP test client with helper methods.
#[derive(Clone)]
pub struct TestClient {
    inner: reqwest::Client,
    base_addr: SocketAddr,
}

impl TestClient {
    pub fn new(addr: SocketAddr) -> Self {
        TestClient {
            inner: reqwest::Client::new(),
            base_addr: addr,
        }
    }

    /// Send a GET request.
    pub async fn get(&self, url: &str) -> TestResponse {
        self.send(self.inner.get(url), "GET").await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, url: &str) -> TestResponse {
        self.send(self.inner.delete(url), "DELETE").await
    }

    /// Send a POST request with a JSON body.
    pub async fn post_json(&self, url: &str, body: &str) -> TestResponse {
        self.send(json(self.inner.post(url), body), "POST").await
    }

    /// Send a PUT request with a JSON body.
    pub async fn put_json(&self, url: &str, body: &str) -> TestResponse {
        self.send(json(self.inner.put(url), body), "PUT").await
    }

    /// Send a PATCH request with a JSON body.
    pub async fn patch_json(&self, url: &str, body: &str) -> TestResponse {
        self.send(json(self.inner.patch(url), body), "PATCH").await
    }

    /// Send a POST request with a multipart form.
    pub async fn post_multipart(&self, url: &str, form: reqwest::multipart::Form) -> TestResponse {
        self.send(self.inner.post(url).multipart(form), "POST").await
    }

    /// Send a POST request with a urlencoded form.
    pub async fn post_form(&self, url: &str, body: &str) -> TestResponse {
        let request = self
            .inner
            .post(url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body.to_string());
        self.send(request, "POST").await
    }

    /// Send a POST request with an arbitrary body and content type.
    pub async fn post_raw(&self, url: &str, content_type: &str, body: Vec<u8>) -> TestResponse {
        let request = self
            .inner
            .post(url)
            .header("Content-Type", content_type)
            .body(body);
        self.send(request, "POST").await
    }

    async fn send(&self, request: reqwest::RequestBuilder, verb: &str) -> TestResponse {
        let res = request
            .send()
            .await
            .unwrap_or_else(|e| panic!("{verb} request failed: {e}"));
        TestResponse::from_response(res).await
    }

    /// Get the base URL.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.base_addr)
    }
}

fn json(request: reqwest::RequestBuilder, body: &str) -> reqwest::RequestBuilder {
    request
        .header("Content-Type", "application/json")
        .body(body.to_string())
}

/// A simplified HTTP response for test assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let body = res.text().await.unwrap_or_default();
        TestResponse {
            status,
            body,
            headers,
        }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Failed to parse response as JSON")
    }

    /// A header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `errors` map of a problem-details body.
    pub fn field_errors(&self) -> serde_json::Value {
        self.json()["errors"].clone()
    }
}

/// Send one request through `router` in-process, without a socket.
pub async fn oneshot(router: Router, request: Request<Body>) -> TestResponse {
    let res = match router.oneshot(request).await {
        Ok(res) => res,
        Err(never) => match never {},
    };
    let status = res.status().as_u16();
    let headers = res.headers().clone();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    TestResponse {
        status,
        body: String::from_utf8_lossy(&bytes).into_owned(),
        headers,
    }
}

/// A responder for calling `Endpoint::handle` directly in unit tests.
pub fn responder<R>() -> Responder<R> {
    Responder::new()
}
