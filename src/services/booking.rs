//! booking.rs
//!
//! Движок транзакции бронирования: весь запрос на покупку мест проходит
//! как единое целое. Порядок шагов:
//!
//! 1. Валидация запроса (пустой список мест, отсутствующее событие).
//! 2. Одна транзакция на весь набор мест - не по транзакции на место.
//! 3. Блокировка всех мест в детерминированном порядке (см. inventory).
//! 4. Проверка принадлежности событию и статуса AVAILABLE под блокировкой.
//! 5. Перевод в BOOKED, создание билета, генерация QR-артефакта.
//! 6. Commit только после успеха всех шагов; любой сбой откатывает все.
//!
//! Повторный идентичный запрос детерминированно получает `SeatUnavailable`:
//! идемпотентность через отказ, а не через дедупликацию.

use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::BookingConfig;
use crate::error::BookingError;
use crate::models::{Seat, Ticket};
use crate::services::artifact::{self, ArtifactGenerator};
use crate::services::inventory;

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub event_id: i64,
    pub seat_ids: Vec<i64>,
}

/// Билет вместе с данными для ответа и журнала действий.
#[derive(Debug, Clone)]
pub struct IssuedTicket {
    pub ticket: Ticket,
    pub seat_label: String,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub event_title: String,
    pub tickets: Vec<IssuedTicket>,
}

/// Бронирует места для покупателя. Все или ничего: при любом сбое ни одно
/// место не меняет статус и ни один билет не сохраняется. Обрыв соединения
/// с клиентом приводит к тому же результату - открытая транзакция
/// откатывается при сбросе.
pub async fn book_seats(
    pool: &PgPool,
    artifacts: &dyn ArtifactGenerator,
    cfg: &BookingConfig,
    customer_id: i64,
    request: &BookingRequest,
) -> Result<BookingOutcome, BookingError> {
    if request.seat_ids.is_empty() {
        return Err(BookingError::InvalidRequest(
            "Список seat_ids не может быть пустым".to_string(),
        ));
    }
    if request.event_id <= 0 {
        return Err(BookingError::InvalidRequest(
            "event_id должен быть > 0".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    inventory::apply_lock_timeout(&mut tx, cfg.lock_timeout_ms).await?;

    let event_title: String =
        sqlx::query_scalar("SELECT title FROM events WHERE id = $1")
            .bind(request.event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                BookingError::InvalidRequest(format!(
                    "Событие {} не найдено",
                    request.event_id
                ))
            })?;

    // Блокировка по возрастанию id фиксирует глобальный порядок захвата
    // и исключает взаимные блокировки пересекающихся запросов
    let locked = inventory::lock_seats(&mut tx, request.event_id, &request.seat_ids).await?;
    let by_id: HashMap<i64, Seat> = locked.into_iter().map(|s| (s.id, s)).collect();

    // Билеты выпускаются в порядке исходного запроса
    let mut issued = Vec::with_capacity(request.seat_ids.len());
    let mut seen = HashSet::with_capacity(request.seat_ids.len());

    for &seat_id in &request.seat_ids {
        let seat = by_id
            .get(&seat_id)
            .ok_or(BookingError::SeatNotFound { seat_id })?;

        // Дубликат в корзине: место уже забронировано этим же запросом
        if !seen.insert(seat_id) {
            return Err(BookingError::SeatUnavailable { label: seat.label() });
        }

        inventory::mark_booked(&mut tx, seat).await?;

        let transaction_id = Uuid::new_v4().to_string();
        let mut ticket = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (customer_id, event_id, seat_id, payment_status, transaction_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(customer_id)
        .bind(request.event_id)
        .bind(seat_id)
        .bind(cfg.payment_mode.initial_status())
        .bind(&transaction_id)
        .fetch_one(&mut *tx)
        .await?;

        // Артефакт - часть атомарной единицы: его сбой отменяет всю покупку
        let payload = artifact::ticket_payload(ticket.id, customer_id, &transaction_id);
        let handle = artifacts
            .generate(&payload)
            .map_err(|e| BookingError::ArtifactGenerationFailed(e.to_string()))?;

        sqlx::query("UPDATE tickets SET qr_code = $1 WHERE id = $2")
            .bind(&handle)
            .bind(ticket.id)
            .execute(&mut *tx)
            .await?;
        ticket.qr_code = Some(handle);

        issued.push(IssuedTicket {
            seat_label: seat.label(),
            price: seat.price,
            ticket,
        });
    }

    tx.commit().await?;

    info!(
        customer_id,
        event_id = request.event_id,
        seats = issued.len(),
        "booking committed"
    );

    Ok(BookingOutcome {
        event_title,
        tickets: issued,
    })
}
