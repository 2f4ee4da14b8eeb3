//! Demo users/products API built from Fennec endpoints.

pub mod endpoints;
pub mod models;
pub mod store;

use std::sync::Arc;

use axum::Json;
use axum::routing::get;
use chrono::{Duration, Utc};
use fennec_core::{Fennec, FennecSettings, Router, ServiceCollection, ServiceProvider};
use fennec_core::register_endpoint;
use serde::Serialize;

use crate::endpoints::*;
use crate::store::{ProductCatalog, ServerInfo, UserStore};

register_endpoint!(
    GetUser,
    CreateUser,
    UpdateUser,
    DeleteUser,
    SearchUsers,
    UpdateUserStatus,
    GetProducts,
    DeleteProduct,
    UploadImage,
    AddImageToMoment,
    UploadMultipleFiles,
    UploadVideo,
    GetHealth,
    GetSecureData,
    TestQueryBinding,
    GetLaps,
);

/// Services shared by every request: seeded stores and server facts.
pub fn services() -> ServiceProvider {
    ServiceCollection::new()
        .add_singleton(Arc::new(UserStore::seeded()))
        .add_singleton(Arc::new(ProductCatalog::seeded()))
        .add_singleton(Arc::new(ServerInfo::new()))
        .build()
}

/// The demo application: every registered endpoint plus a plain axum route.
pub fn app(settings: FennecSettings) -> Fennec {
    Fennec::new(services())
        .settings(settings)
        .discover()
        .routes(weather_routes())
}

const SUMMARIES: [&str; 10] = [
    "Freezing", "Bracing", "Chilly", "Cool", "Mild", "Warm", "Balmy", "Hot", "Sweltering",
    "Scorching",
];

#[derive(Debug, Serialize)]
struct Forecast {
    date: chrono::NaiveDate,
    temperature_c: i32,
    temperature_f: i32,
    summary: &'static str,
}

fn weather_routes() -> Router {
    Router::new().route("/weatherforecast", get(weather_forecast))
}

async fn weather_forecast() -> Json<Vec<Forecast>> {
    let today = Utc::now().date_naive();
    let forecasts = (1..=5i32)
        .map(|day| {
            let temperature_c = (day * 7) % 55 - 20;
            Forecast {
                date: today + Duration::days(i64::from(day)),
                temperature_c,
                temperature_f: 32 + temperature_c * 9 / 5,
                summary: SUMMARIES[day as usize % SUMMARIES.len()],
            }
        })
        .collect();
    Json(forecasts)
}
