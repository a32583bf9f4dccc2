//! inventory.rs
//!
//! Хранилище инвентаря: единственный санкционированный путь изменения
//! статуса мест. Здесь живет гарантия "место не продается дважды".
//!
//! Протокол: все операции выполняются внутри транзакции вызывающей стороны.
//! Блокировки строк (`SELECT ... FOR UPDATE`) берутся строго по возрастанию
//! id места - единый глобальный порядок исключает взаимные блокировки между
//! запросами с пересекающимися наборами мест. Блокировка живет до конца
//! транзакции и снимается автоматически при commit или rollback.

use sqlx::{Postgres, Transaction};
use tracing::debug;

use crate::error::BookingError;
use crate::models::seat::status;
use crate::models::Seat;
use crate::services::layout::NewSeat;

// Код Postgres lock_not_available: истек lock_timeout
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Переводит ошибку истекшего lock_timeout в `Busy`, остальное пробрасывает.
fn map_lock_error(err: sqlx::Error) -> BookingError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
            return BookingError::Busy;
        }
    }
    BookingError::Database(err)
}

/// Ограничивает ожидание блокировок в текущей транзакции.
/// Запрос, не получивший блокировки за отведенное время, завершится
/// ошибкой `Busy` вместо бесконечного ожидания.
pub async fn apply_lock_timeout(
    tx: &mut Transaction<'_, Postgres>,
    timeout_ms: u64,
) -> Result<(), BookingError> {
    // SET LOCAL не принимает bind-параметры, значение приходит из конфига
    sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", timeout_ms))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Берет эксклюзивные блокировки на все указанные места события.
///
/// Идентификаторы сортируются по возрастанию и дедуплицируются, после чего
/// каждая строка блокируется отдельным `SELECT ... FOR UPDATE` в этом
/// порядке. Снимки статусов читаются уже под блокировкой - любое чтение до
/// нее носит справочный характер и решений не принимает.
///
/// Возвращает `SeatNotFound`, если место не существует или относится
/// к другому событию.
pub async fn lock_seats(
    tx: &mut Transaction<'_, Postgres>,
    event_id: i64,
    seat_ids: &[i64],
) -> Result<Vec<Seat>, BookingError> {
    let mut ordered: Vec<i64> = seat_ids.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    let mut seats = Vec::with_capacity(ordered.len());
    for seat_id in ordered {
        let seat = sqlx::query_as::<_, Seat>(
            "SELECT * FROM seats WHERE id = $1 AND event_id = $2 FOR UPDATE",
        )
        .bind(seat_id)
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_lock_error)?
        .ok_or(BookingError::SeatNotFound { seat_id })?;

        debug!(seat_id, status = %seat.status, "seat locked");
        seats.push(seat);
    }

    Ok(seats)
}

/// Переводит место AVAILABLE -> BOOKED. Требует, чтобы место уже было
/// заблокировано текущей транзакцией через [`lock_seats`].
///
/// Проверка статуса выполняется по снимку, снятому под блокировкой,
/// и повторно в самом UPDATE - это и есть защита от перепродажи.
pub async fn mark_booked(
    tx: &mut Transaction<'_, Postgres>,
    seat: &Seat,
) -> Result<(), BookingError> {
    if !seat.is_available() {
        return Err(BookingError::SeatUnavailable { label: seat.label() });
    }

    let result = sqlx::query(
        "UPDATE seats SET status = $1 WHERE id = $2 AND status = $3",
    )
    .bind(status::BOOKED)
    .bind(seat.id)
    .bind(status::AVAILABLE)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BookingError::SeatUnavailable { label: seat.label() });
    }

    Ok(())
}

/// Массовая вставка мест для свежесозданного события одним запросом.
/// Повторная генерация схемы для события запрещена: если хоть одно место
/// уже существует, операция завершается `LayoutExists`.
pub async fn create_seats(
    tx: &mut Transaction<'_, Postgres>,
    event_id: i64,
    seats: &[NewSeat],
) -> Result<u64, BookingError> {
    if seats.is_empty() {
        return Ok(0);
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM seats WHERE event_id = $1)",
    )
    .bind(event_id)
    .fetch_one(&mut **tx)
    .await?;

    if exists {
        return Err(BookingError::LayoutExists { event_id });
    }

    let mut builder = sqlx::QueryBuilder::<Postgres>::new(
        "INSERT INTO seats (event_id, row_label, seat_number, status, price, tier, x_coordinate, y_coordinate) ",
    );
    builder.push_values(seats, |mut b, seat| {
        b.push_bind(event_id)
            .push_bind(&seat.row_label)
            .push_bind(seat.seat_number)
            .push_bind(status::AVAILABLE)
            .push_bind(seat.price)
            .push_bind(seat.tier)
            .push_bind(seat.x_coordinate)
            .push_bind(seat.y_coordinate);
    });

    let result = builder.build().execute(&mut **tx).await?;
    Ok(result.rows_affected())
}
