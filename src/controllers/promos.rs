//! promos.rs
//!
//! Промокоды событий: чтение открыто, изменения доступны только
//! организатору события (или администратору) через WriteAccess.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::BookingError;
use crate::middleware::{AuthUser, WriteAccess};
use crate::models::{Event, PromoCode};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/promos", get(list_promos).post(create_promo))
        .route("/events/promos/{id}", put(update_promo).delete(delete_promo))
}

/* ---------- helpers ---------- */

// Код уникальности Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

async fn owning_event(pool: &sqlx::PgPool, event_id: i64) -> Result<Event, BookingError> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| BookingError::InvalidRequest(format!("Событие {} не найдено", event_id)))
}

async fn promo_by_id(pool: &sqlx::PgPool, promo_id: i64) -> Result<PromoCode, BookingError> {
    sqlx::query_as::<_, PromoCode>("SELECT * FROM promo_codes WHERE id = $1")
        .bind(promo_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| BookingError::InvalidRequest(format!("Промокод {} не найден", promo_id)))
}

fn validate_promo(code: &str, discount_percentage: i32) -> Result<(), BookingError> {
    if code.trim().is_empty() {
        return Err(BookingError::InvalidRequest("code обязателен".to_string()));
    }
    if !(0..=100).contains(&discount_percentage) {
        return Err(BookingError::InvalidRequest(
            "discount_percentage должен быть от 0 до 100".to_string(),
        ));
    }
    Ok(())
}

fn map_duplicate_code(err: sqlx::Error, code: &str, event_id: i64) -> BookingError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return BookingError::InvalidRequest(format!(
                "Промокод {} уже существует для события {}",
                code, event_id
            ));
        }
    }
    BookingError::Database(err)
}

/* ---------- CRUD ---------- */

// GET /api/events/promos?event={id}
#[derive(Debug, Deserialize)]
struct PromosQuery {
    event: Option<i64>,
}

async fn list_promos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PromosQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let promos = match params.event {
        Some(event_id) => {
            sqlx::query_as::<_, PromoCode>(
                "SELECT * FROM promo_codes WHERE event_id = $1 ORDER BY id",
            )
            .bind(event_id)
            .fetch_all(&state.db.pool)
            .await
        }
        None => {
            sqlx::query_as::<_, PromoCode>("SELECT * FROM promo_codes ORDER BY id")
                .fetch_all(&state.db.pool)
                .await
        }
    }
    .map_err(|e| {
        tracing::error!("list_promos sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить промокоды".to_string())
    })?;

    Ok(Json(promos))
}

// POST /api/events/promos
#[derive(Debug, Deserialize)]
struct CreatePromoRequest {
    event_id: i64,
    code: String,
    discount_percentage: i32,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

async fn create_promo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreatePromoRequest>,
) -> Result<impl IntoResponse, BookingError> {
    validate_promo(&req.code, req.discount_percentage)?;

    let event = owning_event(&state.db.pool, req.event_id).await?;
    if !event.can_write(&user) {
        return Err(BookingError::Forbidden);
    }

    let promo = sqlx::query_as::<_, PromoCode>(
        "INSERT INTO promo_codes (event_id, code, discount_percentage, active)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(req.event_id)
    .bind(req.code.trim())
    .bind(req.discount_percentage)
    .bind(req.active)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| map_duplicate_code(e, req.code.trim(), req.event_id))?;

    Ok((StatusCode::CREATED, Json(promo)))
}

// PUT /api/events/promos/{id}
#[derive(Debug, Deserialize)]
struct UpdatePromoRequest {
    code: String,
    discount_percentage: i32,
    active: bool,
}

async fn update_promo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(promo_id): Path<i64>,
    Json(req): Json<UpdatePromoRequest>,
) -> Result<impl IntoResponse, BookingError> {
    validate_promo(&req.code, req.discount_percentage)?;

    let promo = promo_by_id(&state.db.pool, promo_id).await?;
    let event = owning_event(&state.db.pool, promo.event_id).await?;
    if !event.can_write(&user) {
        return Err(BookingError::Forbidden);
    }

    let updated = sqlx::query_as::<_, PromoCode>(
        "UPDATE promo_codes
         SET code = $1, discount_percentage = $2, active = $3
         WHERE id = $4
         RETURNING *",
    )
    .bind(req.code.trim())
    .bind(req.discount_percentage)
    .bind(req.active)
    .bind(promo_id)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| map_duplicate_code(e, req.code.trim(), promo.event_id))?;

    Ok(Json(updated))
}

// DELETE /api/events/promos/{id}
async fn delete_promo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(promo_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let promo = promo_by_id(&state.db.pool, promo_id).await?;
    let event = owning_event(&state.db.pool, promo.event_id).await?;
    if !event.can_write(&user) {
        return Err(BookingError::Forbidden);
    }

    sqlx::query("DELETE FROM promo_codes WHERE id = $1")
        .bind(promo_id)
        .execute(&state.db.pool)
        .await?;

    Ok(Json(json!({ "message": "Промокод удален" })))
}
