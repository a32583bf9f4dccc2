//! error.rs
//!
//! Единая таксономия ошибок бронирования. Любая из этих ошибок прерывает
//! транзакцию целиком: частичных бронирований не бывает.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookingError {
    /// Некорректный ввод со стороны клиента. Повтор без изменений бессмыслен.
    #[error("Некорректный запрос: {0}")]
    InvalidRequest(String),

    /// Место не существует или принадлежит другому событию.
    #[error("Место {seat_id} не найдено")]
    SeatNotFound { seat_id: i64 },

    /// Место уже занято на момент блокировки. Ожидаемый исход гонки,
    /// повтор с другим набором мест безопасен.
    #[error("Место {label} недоступно")]
    SeatUnavailable { label: String },

    /// Блокировку не удалось получить за отведенное время.
    #[error("Места заблокированы другим запросом, попробуйте позже")]
    Busy,

    /// QR-артефакт билета не сформирован, бронирование отменено.
    #[error("Не удалось сформировать QR-код билета: {0}")]
    ArtifactGenerationFailed(String),

    /// Повторная генерация схемы зала для события запрещена.
    #[error("Схема зала для события {event_id} уже создана")]
    LayoutExists { event_id: i64 },

    #[error("Доступ запрещен")]
    Forbidden,

    #[error("Ошибка базы данных")]
    Database(#[from] sqlx::Error),
}

impl BookingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BookingError::SeatNotFound { .. } => StatusCode::BAD_REQUEST,
            BookingError::SeatUnavailable { .. } => StatusCode::CONFLICT,
            BookingError::Busy => StatusCode::CONFLICT,
            BookingError::ArtifactGenerationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BookingError::LayoutExists { .. } => StatusCode::CONFLICT,
            BookingError::Forbidden => StatusCode::FORBIDDEN,
            BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            BookingError::InvalidRequest(_) => "INVALID_REQUEST",
            BookingError::SeatNotFound { .. } => "SEAT_NOT_FOUND",
            BookingError::SeatUnavailable { .. } => "SEAT_UNAVAILABLE",
            BookingError::Busy => "BUSY",
            BookingError::ArtifactGenerationFailed(_) => "ARTIFACT_FAILED",
            BookingError::LayoutExists { .. } => "LAYOUT_EXISTS",
            BookingError::Forbidden => "FORBIDDEN",
            BookingError::Database(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        // Детали SQL-ошибок остаются в логах, клиенту уходит общий текст
        let message = match &self {
            BookingError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "Внутренняя ошибка сервера".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": self.kind(),
            "message": message,
        });

        match &self {
            BookingError::SeatNotFound { seat_id } => {
                body["seat_id"] = json!(seat_id);
            }
            BookingError::SeatUnavailable { label } => {
                body["seat"] = json!(label);
            }
            BookingError::LayoutExists { event_id } => {
                body["event_id"] = json!(event_id);
            }
            _ => {}
        }

        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contention_errors_map_to_conflict() {
        let unavailable = BookingError::SeatUnavailable { label: "A1".into() };
        assert_eq!(unavailable.status_code(), StatusCode::CONFLICT);
        assert_eq!(BookingError::Busy.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn caller_errors_map_to_bad_request() {
        let invalid = BookingError::InvalidRequest("seat_ids пуст".into());
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        let not_found = BookingError::SeatNotFound { seat_id: 42 };
        assert_eq!(not_found.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn artifact_failure_is_internal() {
        let err = BookingError::ArtifactGenerationFailed("encoder down".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unavailable_message_names_the_seat() {
        let err = BookingError::SeatUnavailable { label: "B3".into() };
        assert!(err.to_string().contains("B3"));
    }
}
