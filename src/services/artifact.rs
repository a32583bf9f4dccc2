//! artifact.rs
//!
//! Коллаборатор QR-артефактов. Сама отрисовка изображения - внешний сервис;
//! здесь формируется полезная нагрузка билета и непрозрачный handle
//! артефакта. Контракт: детерминированность при успехе и громкий отказ
//! при ошибке - сбой генерации отменяет бронирование целиком.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("полезная нагрузка билета пуста")]
    EmptyPayload,
    #[error("кодировщик недоступен: {0}")]
    Encoder(String),
}

/// Содержимое QR-кода билета: по нему билет проверяется на входе.
pub fn ticket_payload(ticket_id: i64, customer_id: i64, transaction_id: &str) -> String {
    format!("TICKET:{}-USER:{}-{}", ticket_id, customer_id, transaction_id)
}

pub trait ArtifactGenerator: Send + Sync {
    /// Возвращает непрозрачный handle артефакта для данной нагрузки.
    /// Для одинаковой нагрузки handle одинаков.
    fn generate(&self, payload: &str) -> Result<String, ArtifactError>;
}

/// Штатная реализация: контент-адресуемый handle из SHA-256 нагрузки.
/// Сервис отрисовки превращает его в PNG по этому же пути.
pub struct QrPayloadEncoder;

impl ArtifactGenerator for QrPayloadEncoder {
    fn generate(&self, payload: &str) -> Result<String, ArtifactError> {
        if payload.is_empty() {
            return Err(ArtifactError::EmptyPayload);
        }

        let digest = Sha256::digest(payload.as_bytes());
        let encoded = general_purpose::URL_SAFE_NO_PAD.encode(digest);
        Ok(format!("qr/{}.png", &encoded[..22]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_has_expected_shape() {
        let payload = ticket_payload(7, 42, "abc-123");
        assert_eq!(payload, "TICKET:7-USER:42-abc-123");
    }

    #[test]
    fn handle_is_deterministic() {
        let encoder = QrPayloadEncoder;
        let a = encoder.generate("TICKET:1-USER:2-x").unwrap();
        let b = encoder.generate("TICKET:1-USER:2-x").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_payloads_get_different_handles() {
        let encoder = QrPayloadEncoder;
        let a = encoder.generate("TICKET:1-USER:2-x").unwrap();
        let b = encoder.generate("TICKET:2-USER:2-x").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_payload_fails_loudly() {
        let encoder = QrPayloadEncoder;
        assert!(matches!(
            encoder.generate(""),
            Err(ArtifactError::EmptyPayload)
        ));
    }

    #[test]
    fn handle_looks_like_a_stored_object() {
        let encoder = QrPayloadEncoder;
        let handle = encoder.generate("TICKET:9-USER:1-tx").unwrap();
        assert!(handle.starts_with("qr/"));
        assert!(handle.ends_with(".png"));
    }
}
