//! audit.rs
//!
//! Журнал действий для административной панели. Запись идет в фоне и
//! по принципу "лучшее из возможного": сбой журналирования никогда не
//! откатывает бронирование или создание события.

use sqlx::PgPool;
use tracing::warn;

pub mod actions {
    pub const LOGIN: &str = "LOGIN";
    pub const CREATE_EVENT: &str = "CREATE_EVENT";
    pub const BOOK_TICKET: &str = "BOOK_TICKET";
}

#[derive(Clone)]
pub struct AuditLog {
    pool: PgPool,
}

impl AuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Фиксирует действие пользователя. Не блокирует вызывающего:
    /// вставка выполняется в отдельной задаче, ошибки только логируются.
    pub fn record(&self, user_id: i64, action: &'static str, details: String) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let result = sqlx::query(
                "INSERT INTO action_logs (user_id, action, details) VALUES ($1, $2, $3)",
            )
            .bind(user_id)
            .bind(action)
            .bind(&details)
            .execute(&pool)
            .await;

            if let Err(e) = result {
                warn!("failed to write action log {}: {:?}", action, e);
            }
        });
    }
}
