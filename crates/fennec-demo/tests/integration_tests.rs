use axum::body::Body;
use axum::http::Request;
use fennec_core::endpoint::HttpMethod;
use fennec_core::testing::{TestResponse, oneshot};
use fennec_core::{FennecSettings, TestServer};
use reqwest::multipart::{Form, Part};

/// Router for in-process requests; every call gets freshly seeded stores.
fn router() -> axum::Router {
    fennec_demo::app(FennecSettings::default())
        .into_router()
        .expect("demo app should build")
}

async fn get(uri: &str) -> TestResponse {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    oneshot(router(), request).await
}

async fn send_json(method: &str, uri: &str, body: serde_json::Value) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    oneshot(router(), request).await
}

fn file_part(bytes: &[u8], file_name: &str, mime: &str) -> Part {
    Part::bytes(bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str(mime)
        .unwrap()
}

#[test]
fn test_every_endpoint_is_mounted() {
    let app = fennec_demo::app(FennecSettings::default()).build().unwrap();
    let routes = app.routes();

    assert!(routes.find(HttpMethod::Get, "/users/{id}").is_some());
    assert!(routes.find(HttpMethod::Patch, "/users/{id}/status").is_some());
    assert!(routes.find(HttpMethod::Post, "/videos/{id}").is_some());

    let laps: Vec<_> = routes.by_endpoint("GetLaps").map(|e| e.path.as_str()).collect();
    assert_eq!(
        laps,
        [
            "/laps/moment/{moment_id}/sub/{sub_moment_id}",
            "/laps/moment/{moment_id}/sub",
        ]
    );

    let secure = routes.find(HttpMethod::Get, "/secure/data/{id}").unwrap();
    assert!(secure.requires_authorization);
    let health = routes.find(HttpMethod::Get, "/health").unwrap();
    assert_eq!(health.name, "HealthCheck");
    assert!(!health.requires_authorization);
}

#[tokio::test]
async fn test_health() {
    let res = get("/health").await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["status"], "Healthy");
    assert!(body["uptime_seconds"].is_u64());
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_weather_route_sits_beside_endpoints() {
    let res = get("/weatherforecast").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.json().as_array().unwrap().len(), 5);
}

// ── Users ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_user() {
    let res = get("/users/1").await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["name"], "Ada Lovelace");
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["status"], "Active");
}

#[tokio::test]
async fn test_get_missing_user() {
    let res = get("/users/99").await;
    assert_eq!(res.status, 404);
    assert_eq!(res.json()["detail"], "User 99 does not exist");
}

#[tokio::test]
async fn test_get_user_with_bad_id() {
    let res = get("/users/abc").await;
    assert_eq!(res.status, 400);
    assert_eq!(res.field_errors()["id"][0], "'abc' is not a valid i32");
}

#[tokio::test]
async fn test_create_user() {
    let res = send_json(
        "POST",
        "/users",
        serde_json::json!({ "name": "Edsger Dijkstra", "email": "edsger@example.com", "age": 72 }),
    )
    .await;
    assert_eq!(res.status, 201);
    assert_eq!(res.header("location"), Some("/users/4"));
    let body = res.json();
    assert_eq!(body["id"], 4);
    assert_eq!(body["age"], 72);
    assert!(body["phone_number"].is_null());
}

#[tokio::test]
async fn test_create_user_requires_name() {
    let res = send_json("POST", "/users", serde_json::json!({ "email": "x@example.com" })).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.json()["detail"], "Name is required");
}

#[tokio::test]
async fn test_update_user() {
    let res = send_json("PUT", "/users/2", serde_json::json!({ "name": "Rear Admiral Hopper" })).await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["id"], 2);
    assert_eq!(body["name"], "Rear Admiral Hopper");
    assert_eq!(body["email"], "grace@example.com");
}

#[tokio::test]
async fn test_update_missing_user() {
    let res = send_json("PUT", "/users/42", serde_json::json!({ "name": "Nobody" })).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_delete_user() {
    let server = TestServer::from_app(fennec_demo::app(FennecSettings::default())).await;

    let res = server.client.delete(&server.url("/users/3")).await;
    assert_eq!(res.status, 204);
    assert!(res.body.is_empty());

    let res = server.client.get(&server.url("/users/3")).await;
    assert_eq!(res.status, 404);

    let res = server.client.delete(&server.url("/users/3")).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_search_users() {
    let res = get("/users/search?minAge=40").await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 10);
    let names: Vec<_> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Grace Hopper", "Alan Turing"]);
}

#[tokio::test]
async fn test_search_users_paging() {
    let body = get("/users/search?page=2&page_size=2").await.json();
    assert_eq!(body["total_count"], 3);
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
    assert_eq!(body["users"][0]["name"], "Alan Turing");
}

#[tokio::test]
async fn test_search_users_rejects_bad_paging() {
    let res = get("/users/search?page=0&page_size=500").await;
    assert_eq!(res.status, 400);
    let errors = res.field_errors();
    assert_eq!(errors["page"][0], "Page numbers start at 1");
    assert_eq!(errors["page_size"][0], "Page size must be between 1 and 100");
}

#[tokio::test]
async fn test_search_users_bad_status() {
    let res = get("/users/search?status=retired").await;
    assert_eq!(res.status, 400);
    assert!(res.field_errors()["status"].is_array());
}

#[tokio::test]
async fn test_update_user_status() {
    let res = send_json(
        "PATCH",
        "/users/1/status",
        serde_json::json!({
            "status": "Suspended",
            "reason": "Too many analytical engines",
            "effective_date": "2024-05-01T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["id"], 1);
    assert_eq!(body["status"], "Suspended");
    assert_eq!(body["status_reason"], "Too many analytical engines");
}

#[tokio::test]
async fn test_update_user_status_requires_status() {
    let res = send_json("PATCH", "/users/1/status", serde_json::json!({ "reason": "none" })).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.field_errors()["status"][0], "A value for 'status' is required.");
}

// ── Products ───────────────────────────────────────────────────

#[tokio::test]
async fn test_products_filtering() {
    let all = get("/api/products").await.json();
    assert_eq!(all["total_count"], 3);

    let books = get("/api/products?category=books").await.json();
    assert_eq!(books["total_count"], 1);
    assert_eq!(books["products"][0]["name"], "Product 2");

    let out_of_stock = get("/api/products?inStock=false").await.json();
    assert_eq!(out_of_stock["total_count"], 1);
    assert_eq!(out_of_stock["products"][0]["id"], 3);
}

#[tokio::test]
async fn test_delete_product() {
    let server = TestServer::from_app(fennec_demo::app(FennecSettings::default())).await;

    let res = server
        .client
        .delete(&server.url("/api/products/2?reason=discontinued"))
        .await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["id"], 2);
    assert_eq!(body["message"], "Product 2 deleted successfully");

    let res = server.client.delete(&server.url("/api/products/2")).await;
    assert_eq!(res.status, 404);
    assert_eq!(res.json()["detail"], "Product 2 does not exist");
}

// ── Binding echo ───────────────────────────────────────────────

#[tokio::test]
async fn test_query_binding_of_each_primitive() {
    let res = get(
        "/api/test-binding/7?name=echo&age=30&isActive=TRUE&price=9.5\
         &date=2024-01-15&guid=6f9619ff-8b86-d011-b42d-00c04fc964ff",
    )
    .await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["id"], 7);
    assert_eq!(body["name"], "echo");
    assert_eq!(body["age"], 30);
    assert_eq!(body["is_active"], true);
    assert_eq!(body["price"], 9.5);
    assert_eq!(body["date"], "2024-01-15");
    assert_eq!(body["guid"], "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    assert_eq!(body["category"], "general");
}

#[tokio::test]
async fn test_query_binding_leaves_absent_values_empty() {
    let body = get("/api/test-binding/1?category=tools").await.json();
    assert!(body["name"].is_null());
    assert!(body["guid"].is_null());
    assert_eq!(body["category"], "tools");
}

#[tokio::test]
async fn test_query_binding_collects_every_error() {
    let res = get("/api/test-binding/1?age=old&price=cheap&date=someday").await;
    assert_eq!(res.status, 400);
    let errors = res.field_errors();
    assert_eq!(errors.as_object().unwrap().len(), 3);
    assert!(errors["age"][0].as_str().unwrap().contains("'old'"));
    assert!(errors["price"][0].as_str().unwrap().contains("'cheap'"));
    assert!(errors["date"][0].as_str().unwrap().contains("'someday'"));
}

#[tokio::test]
async fn test_optional_route_segment() {
    let moment = "0b6c1e3a-5f4d-4c2b-9a8e-7d6f5e4c3b2a";
    let sub = "1c7d2f4b-6a5e-4d3c-8b9f-0e1d2c3b4a59";

    let res = get(&format!("/laps/moment/{moment}/sub/{sub}")).await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["moment_id"], moment);
    assert_eq!(body["sub_moment_id"], sub);
    assert_eq!(body["laps"].as_array().unwrap().len(), 1);

    let res = get(&format!("/laps/moment/{moment}/sub")).await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert!(body["sub_moment_id"].is_null());
    assert_eq!(body["laps"].as_array().unwrap().len(), 3);
}

// ── Secured ────────────────────────────────────────────────────

#[tokio::test]
async fn test_secure_data_requires_token() {
    let res = get("/secure/data/5").await;
    assert_eq!(res.status, 401);

    let request = Request::builder()
        .uri("/secure/data/5")
        .header("authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap();
    let res = oneshot(router(), request).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.json()["secret"], "secret-5");
}

// ── Uploads ────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_image() {
    let server = TestServer::from_app(fennec_demo::app(FennecSettings::default())).await;

    let form = Form::new()
        .part("file", file_part(&[0x89, b'P', b'N', b'G'], "cat.png", "image/png"))
        .text("description", "a cat");
    let res = server
        .client
        .post_multipart(&server.url("/images/upload"), form)
        .await;
    assert_eq!(res.status, 204);

    let form = Form::new().part("file", file_part(b"hello", "notes.txt", "text/plain"));
    let res = server
        .client
        .post_multipart(&server.url("/images/upload"), form)
        .await;
    assert_eq!(res.status, 400);
    assert!(res.json()["detail"].as_str().unwrap().starts_with("Invalid file type"));

    let form = Form::new().text("description", "nothing attached");
    let res = server
        .client
        .post_multipart(&server.url("/images/upload"), form)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.json()["detail"], "File is required");
}

#[tokio::test]
async fn test_add_image_to_moment() {
    let server = TestServer::from_app(fennec_demo::app(FennecSettings::default())).await;

    let form = Form::new().part("file", file_part(b"GIF89a", "wave.gif", "image/gif"));
    let res = server
        .client
        .post_multipart(
            &server.url("/image/moment/00000000-0000-0000-0000-000000000000"),
            form,
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.json()["detail"], "Invalid MomentId");

    let form = Form::new().part("file", file_part(b"GIF89a", "wave.gif", "image/gif"));
    let res = server
        .client
        .post_multipart(
            &server.url("/image/moment/0b6c1e3a-5f4d-4c2b-9a8e-7d6f5e4c3b2a"),
            form,
        )
        .await;
    assert_eq!(res.status, 204);
}

#[tokio::test]
async fn test_upload_multiple_files() {
    let server = TestServer::from_app(fennec_demo::app(FennecSettings::default())).await;

    let form = Form::new()
        .part("files", file_part(b"first", "a.txt", "text/plain"))
        .part("files", file_part(b"second!", "b.txt", "text/plain"))
        .text("category", "docs");
    let res = server
        .client
        .post_multipart(&server.url("/files/upload-multiple"), form)
        .await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["count"], 2);
    assert_eq!(body["total_bytes"], 12);
    assert_eq!(body["category"], "docs");
    assert_eq!(body["files"][1]["file_name"], "b.txt");

    let form = Form::new().text("category", "docs");
    let res = server
        .client
        .post_multipart(&server.url("/files/upload-multiple"), form)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.json()["detail"], "At least one file is required");
}

#[tokio::test]
async fn test_streamed_video_upload() {
    let server = TestServer::from_app(fennec_demo::app(FennecSettings::default())).await;
    let id = "6f9619ff-8b86-d011-b42d-00c04fc964ff";

    let payload = vec![7u8; 200 * 1024];
    let form = Form::new().part("video", file_part(&payload, "clip.mp4", "video/mp4"));
    let res = server
        .client
        .post_multipart(&server.url(&format!("/videos/{id}")), form)
        .await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["id"], id);
    assert_eq!(body["file_name"], "clip.mp4");
    assert_eq!(body["bytes"], 200 * 1024);

    let res = server
        .client
        .post_multipart(&server.url(&format!("/videos/{id}")), Form::new().text("x", "y"))
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.json()["detail"], "Video file is required.");
}
