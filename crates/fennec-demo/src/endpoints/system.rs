use chrono::{DateTime, NaiveDate, Utc};
use fennec_core::prelude::*;
use uuid::Uuid;

use crate::store::ServerInfo;

const DEMO_TOKEN: &str = "test-token";

// ── Health ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

#[derive(Injectable)]
pub struct GetHealth {
    info: Arc<ServerInfo>,
}

#[async_trait]
impl Endpoint for GetHealth {
    type Request = ();
    type Response = HealthResponse;

    fn configure(route: &mut RouteConfig) {
        route
            .get("/health")
            .name("HealthCheck")
            .tags(["System"])
            .allow_anonymous()
            .produces_type::<HealthResponse>(200);
    }

    async fn handle(
        &self,
        _request: (),
        _cx: HandlerContext,
        send: Responder<HealthResponse>,
    ) -> Result<Sent, FennecError> {
        Ok(send.ok(HealthResponse {
            status: "Healthy",
            timestamp: Utc::now(),
            uptime_seconds: self.info.uptime().as_secs(),
            version: self.info.version,
        }))
    }
}

// ── Secured ────────────────────────────────────────────────────

#[derive(Debug, BindRequest)]
pub struct SecureDataRequest {
    pub id: i32,
}

#[derive(Debug, Serialize)]
pub struct SecureDataResponse {
    pub id: i32,
    pub secret: String,
}

/// Route metadata marks this endpoint as protected; the bearer check
/// below stands in for real authentication middleware.
#[derive(Injectable)]
pub struct GetSecureData;

#[async_trait]
impl Endpoint for GetSecureData {
    type Request = SecureDataRequest;
    type Response = SecureDataResponse;

    fn configure(route: &mut RouteConfig) {
        route
            .get("/secure/data/{id:int}")
            .tags(["Secure"])
            .require_authorization(["reader"])
            .produces_type::<SecureDataResponse>(200)
            .produces_problem(401);
    }

    async fn handle(
        &self,
        request: SecureDataRequest,
        cx: HandlerContext,
        send: Responder<SecureDataResponse>,
    ) -> Result<Sent, FennecError> {
        let authorized = cx
            .header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| token == DEMO_TOKEN);
        if !authorized {
            return Ok(send.unauthorized_message("A valid bearer token is required"));
        }
        Ok(send.ok(SecureDataResponse {
            id: request.id,
            secret: format!("secret-{}", request.id),
        }))
    }
}

// ── Binding echo ───────────────────────────────────────────────

#[derive(Debug, BindRequest)]
pub struct TestBindingRequest {
    pub id: i32,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub is_active: Option<bool>,
    pub price: Option<f64>,
    pub date: Option<NaiveDate>,
    pub guid: Option<Uuid>,
    #[bind(default = r#""general".to_string()"#)]
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct TestBindingResponse {
    pub id: i32,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub is_active: Option<bool>,
    pub price: Option<f64>,
    pub date: Option<NaiveDate>,
    pub guid: Option<Uuid>,
    pub category: String,
}

/// Echoes every bound value back, one per supported primitive.
#[derive(Injectable)]
pub struct TestQueryBinding;

#[async_trait]
impl Endpoint for TestQueryBinding {
    type Request = TestBindingRequest;
    type Response = TestBindingResponse;

    fn configure(route: &mut RouteConfig) {
        route
            .get("/api/test-binding/{id}")
            .tags(["Diagnostics"])
            .allow_anonymous()
            .produces_type::<TestBindingResponse>(200)
            .produces_problem(400);
    }

    async fn handle(
        &self,
        r: TestBindingRequest,
        _cx: HandlerContext,
        send: Responder<TestBindingResponse>,
    ) -> Result<Sent, FennecError> {
        Ok(send.ok(TestBindingResponse {
            id: r.id,
            name: r.name,
            age: r.age,
            is_active: r.is_active,
            price: r.price,
            date: r.date,
            guid: r.guid,
            category: r.category,
        }))
    }
}

// ── Optional route segment ─────────────────────────────────────

#[derive(Debug, BindRequest)]
pub struct GetLapsRequest {
    pub moment_id: Uuid,
    pub sub_moment_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct LapsResponse {
    pub moment_id: Uuid,
    pub sub_moment_id: Option<Uuid>,
    pub laps: Vec<u32>,
}

#[derive(Injectable)]
pub struct GetLaps;

#[async_trait]
impl Endpoint for GetLaps {
    type Request = GetLapsRequest;
    type Response = LapsResponse;

    fn configure(route: &mut RouteConfig) {
        route
            .get("/laps/moment/{moment_id:guid}/sub/{sub_moment_id?}")
            .tags(["Laps"])
            .allow_anonymous()
            .produces_type::<LapsResponse>(200);
    }

    async fn handle(
        &self,
        request: GetLapsRequest,
        _cx: HandlerContext,
        send: Responder<LapsResponse>,
    ) -> Result<Sent, FennecError> {
        let laps = match request.sub_moment_id {
            Some(_) => vec![1],
            None => vec![1, 2, 3],
        };
        Ok(send.ok(LapsResponse {
            moment_id: request.moment_id,
            sub_moment_id: request.sub_moment_id,
            laps,
        }))
    }
}
