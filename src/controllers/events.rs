//! events.rs
//!
//! Управление событиями: создание с генерацией схемы зала, список,
//! карта мест и аналитика продаж для организатора.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::error::BookingError;
use crate::middleware::{AuthUser, WriteAccess};
use crate::models::{Event, Seat};
use crate::services::audit::actions;
use crate::services::inventory;
use crate::services::layout::{self, TierPrices};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events", get(list_events))
        .route("/events/analytics", get(organizer_analytics))
        .route("/events/{id}/seats", get(event_seats))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
}

/* ---------- СОЗДАНИЕ СОБЫТИЯ ---------- */

#[derive(Debug, Deserialize)]
struct TierPricesBody {
    vip: Option<f64>,
    standard: Option<f64>,
    economy: Option<f64>,
}

// POST /api/events
#[derive(Debug, Deserialize)]
struct CreateEventRequest {
    title: String,
    description: Option<String>,
    location: String,
    date_time: NaiveDateTime,
    seat_rows: Option<u32>,
    seat_cols: Option<u32>,
    tier_prices: Option<TierPricesBody>,
    seat_price: Option<f64>,
}

#[derive(Debug, Serialize)]
struct CreateEventResponse {
    #[serde(flatten)]
    event: Event,
    seats_created: u64,
}

/// Создает событие; при наличии параметров сетки синхронно генерирует
/// схему зала в той же транзакции. Ответ содержит число созданных мест.
async fn create_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, BookingError> {
    if !user.is_organizer() {
        return Err(BookingError::Forbidden);
    }
    if req.title.trim().is_empty() || req.location.trim().is_empty() {
        return Err(BookingError::InvalidRequest(
            "title и location обязательны".to_string(),
        ));
    }

    // Схему считаем заранее: ошибки размеров сетки не открывают транзакцию
    let seats = match (req.seat_rows, req.seat_cols) {
        (Some(rows), Some(cols)) => {
            let body = req.tier_prices.as_ref();
            let prices = TierPrices::resolve(
                body.and_then(|p| p.vip),
                body.and_then(|p| p.standard),
                body.and_then(|p| p.economy),
                req.seat_price,
            );
            Some(layout::generate_layout(rows, cols, &prices)?)
        }
        _ => None,
    };

    let mut tx = state.db.pool.begin().await?;

    let event = sqlx::query_as::<_, Event>(
        "INSERT INTO events (organizer_id, title, description, location, date_time)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(user.user_id)
    .bind(&req.title)
    .bind(req.description.as_deref().unwrap_or_default())
    .bind(&req.location)
    .bind(req.date_time)
    .fetch_one(&mut *tx)
    .await?;

    let seats_created = match seats {
        Some(ref layout) => inventory::create_seats(&mut tx, event.id, layout).await?,
        None => 0,
    };

    tx.commit().await?;

    state.audit.record(
        user.user_id,
        actions::CREATE_EVENT,
        format!("Created event: {} at {}", event.title, event.location),
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse { event, seats_created }),
    ))
}

/* ---------- СПИСОК И КАРТА МЕСТ ---------- */

#[derive(Debug, Deserialize)]
struct EventsQuery {
    page: Option<u32>,
    #[serde(rename = "pageSize")]
    page_size: Option<u32>,
}

// GET /api/events
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * page_size;

    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events ORDER BY date_time LIMIT $1 OFFSET $2",
    )
    .bind(page_size as i64)
    .bind(offset as i64)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("list_events sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить список событий".to_string())
    })?;

    Ok(Json(events))
}

// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("get_event sql error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Ошибка БД".to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Событие не найдено".to_string()))?;

    Ok(Json(event))
}

// PUT /api/events/{id}
#[derive(Debug, Deserialize)]
struct UpdateEventRequest {
    title: String,
    description: Option<String>,
    location: String,
    date_time: NaiveDateTime,
}

// Редактировать событие может только его организатор (или администратор).
// Схема зала при этом не меняется: места после создания неизменны.
async fn update_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<i64>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, BookingError> {
    if req.title.trim().is_empty() || req.location.trim().is_empty() {
        return Err(BookingError::InvalidRequest(
            "title и location обязательны".to_string(),
        ));
    }

    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| {
            BookingError::InvalidRequest(format!("Событие {} не найдено", event_id))
        })?;

    if !event.can_write(&user) {
        return Err(BookingError::Forbidden);
    }

    let updated = sqlx::query_as::<_, Event>(
        "UPDATE events
         SET title = $1, description = $2, location = $3, date_time = $4
         WHERE id = $5
         RETURNING *",
    )
    .bind(&req.title)
    .bind(req.description.as_deref().unwrap_or(&event.description))
    .bind(&req.location)
    .bind(req.date_time)
    .bind(event_id)
    .fetch_one(&state.db.pool)
    .await?;

    Ok(Json(updated))
}

// GET /api/events/{id}/seats
async fn event_seats(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)",
    )
    .bind(event_id)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("event_seats sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Ошибка БД".to_string())
    })?;

    if !exists {
        return Err((StatusCode::NOT_FOUND, "Событие не найдено".to_string()));
    }

    let seats = sqlx::query_as::<_, Seat>(
        "SELECT * FROM seats WHERE event_id = $1 ORDER BY row_label, seat_number",
    )
    .bind(event_id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("event_seats sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить карту мест".to_string())
    })?;

    Ok(Json(seats))
}

// DELETE /api/events/{id}
async fn delete_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| {
            BookingError::InvalidRequest(format!("Событие {} не найдено", event_id))
        })?;

    if !event.can_write(&user) {
        return Err(BookingError::Forbidden);
    }

    // Места удаляются каскадом вместе с событием
    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&state.db.pool)
        .await?;

    Ok(Json(json!({ "message": "Событие удалено" })))
}

/* ---------- АНАЛИТИКА ---------- */

#[derive(Debug, Serialize, sqlx::FromRow)]
struct EventStats {
    id: i64,
    title: String,
    date: NaiveDateTime,
    total_seats: i64,
    sold: i64,
    available: i64,
    revenue: f64,
}

#[derive(Debug, Serialize)]
struct AnalyticsResponse {
    total_events: i64,
    total_tickets_sold: i64,
    total_revenue: f64,
    events: Vec<EventStats>,
}

// GET /api/events/analytics
//
// Сводка продаж текущего организатора: выручка и разбивка по событиям.
// Считаются только билеты со статусом оплаты COMPLETED.
async fn organizer_analytics(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, BookingError> {
    if !user.is_organizer() {
        return Err(BookingError::Forbidden);
    }

    let events = sqlx::query_as::<_, EventStats>(
        r#"
        SELECT e.id,
               e.title,
               e.date_time AS date,
               (SELECT COUNT(*) FROM seats s WHERE s.event_id = e.id) AS total_seats,
               (SELECT COUNT(*) FROM tickets t
                 WHERE t.event_id = e.id AND t.payment_status = 'COMPLETED') AS sold,
               (SELECT COUNT(*) FROM seats s
                 WHERE s.event_id = e.id AND s.status = 'AVAILABLE') AS available,
               COALESCE((SELECT SUM(s.price) FROM tickets t
                           JOIN seats s ON s.id = t.seat_id
                          WHERE t.event_id = e.id
                            AND t.payment_status = 'COMPLETED'), 0) AS revenue
        FROM events e
        WHERE e.organizer_id = $1
        ORDER BY e.date_time
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.db.pool)
    .await?;

    let response = AnalyticsResponse {
        total_events: events.len() as i64,
        total_tickets_sold: events.iter().map(|e| e.sold).sum(),
        total_revenue: events.iter().map(|e| e.revenue).sum(),
        events,
    };

    Ok(Json(response))
}
