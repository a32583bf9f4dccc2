//! tickets.rs
//!
//! Покупка билетов. Сама транзакция бронирования живет в
//! services::booking; здесь только нормализация запроса, формирование
//! ответа и запись в журнал действий после успешного коммита.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::BookingError;
use crate::middleware::AuthUser;
use crate::services::audit::actions;
use crate::services::booking::{self, BookingRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", post(book_tickets))
        .route("/tickets", get(my_tickets))
}

// POST /api/tickets
//
// Принимает { event_id, seat_ids: [..] }; историческая форма
// { event_id, seat_id } нормализуется в список из одного элемента.
#[derive(Debug, Deserialize)]
struct BookTicketsRequest {
    event_id: i64,
    #[serde(default)]
    seat_ids: Vec<i64>,
    seat_id: Option<i64>,
}

impl BookTicketsRequest {
    fn seat_list(&self) -> Vec<i64> {
        if !self.seat_ids.is_empty() {
            self.seat_ids.clone()
        } else {
            self.seat_id.into_iter().collect()
        }
    }
}

#[derive(Debug, Serialize)]
struct TicketResponse {
    id: i64,
    event_id: i64,
    seat_id: i64,
    seat_label: String,
    event_title: String,
    payment_status: String,
    transaction_id: Option<String>,
    qr_code: Option<String>,
    purchase_date: NaiveDateTime,
}

#[derive(Debug, Serialize)]
struct BookTicketsResponse {
    count: usize,
    tickets: Vec<TicketResponse>,
}

async fn book_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BookTicketsRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let request = BookingRequest {
        event_id: req.event_id,
        seat_ids: req.seat_list(),
    };

    let outcome = booking::book_seats(
        &state.db.pool,
        state.artifacts.as_ref(),
        &state.config.booking,
        user.user_id,
        &request,
    )
    .await?;

    // Журнал пишется после коммита и не влияет на исход бронирования
    for issued in &outcome.tickets {
        state.audit.record(
            user.user_id,
            actions::BOOK_TICKET,
            format!(
                "Booked ticket for event: {} (Seat: {})",
                outcome.event_title, issued.seat_label
            ),
        );
    }

    let tickets: Vec<TicketResponse> = outcome
        .tickets
        .into_iter()
        .map(|issued| TicketResponse {
            id: issued.ticket.id,
            event_id: issued.ticket.event_id,
            seat_id: issued.ticket.seat_id,
            seat_label: issued.seat_label,
            event_title: outcome.event_title.clone(),
            payment_status: issued.ticket.payment_status,
            transaction_id: issued.ticket.transaction_id,
            qr_code: issued.ticket.qr_code,
            purchase_date: issued.ticket.purchase_date,
        })
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(BookTicketsResponse { count: tickets.len(), tickets }),
    ))
}

// GET /api/tickets
#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i64,
    event_id: i64,
    seat_id: i64,
    row_label: String,
    seat_number: i32,
    title: String,
    payment_status: String,
    transaction_id: Option<String>,
    qr_code: Option<String>,
    purchase_date: NaiveDateTime,
}

async fn my_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let rows = sqlx::query_as::<_, TicketRow>(
        r#"
        SELECT t.id, t.event_id, t.seat_id, s.row_label, s.seat_number,
               e.title, t.payment_status, t.transaction_id, t.qr_code, t.purchase_date
        FROM tickets t
        JOIN seats s ON s.id = t.seat_id
        JOIN events e ON e.id = t.event_id
        WHERE t.customer_id = $1
        ORDER BY t.purchase_date DESC, t.id DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("my_tickets sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить список билетов".to_string())
    })?;

    let tickets: Vec<TicketResponse> = rows
        .into_iter()
        .map(|r| TicketResponse {
            id: r.id,
            event_id: r.event_id,
            seat_id: r.seat_id,
            seat_label: format!("{}{}", r.row_label, r.seat_number),
            event_title: r.title,
            payment_status: r.payment_status,
            transaction_id: r.transaction_id,
            qr_code: r.qr_code,
            purchase_date: r.purchase_date,
        })
        .collect();

    Ok(Json(tickets))
}
