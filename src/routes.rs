use actix_web::{get, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::expense_client::DynExpenseSource;
use crate::schemas::UserId;
use crate::summary::fetch_summary;

#[derive(Deserialize, Serialize)]
struct HealthJson {
    status: String,
    timestamp: DateTime<Utc>,
}

#[get("/analytics-service/summary/{user_id}")]
#[tracing::instrument(skip(source))]
async fn get_summary(
    source: web::Data<DynExpenseSource>,
    user_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let raw = user_id.into_inner();
    let user_id = raw
        .trim()
        .parse::<UserId>()
        .map_err(|_| AppError::InvalidUserId(raw.clone()))?;

    let summary = fetch_summary(&***source, user_id).await?;
    info!(
        user_id,
        expenses = summary.expenses.len(),
        categories = summary.category_totals.len(),
        "summary computed"
    );
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthJson {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_summary).service(health);
}
