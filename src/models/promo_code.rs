use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Промокод действует в рамках одного события. Применение скидки -
// забота оформления заказа, здесь только управление кодами.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: i64,
    pub event_id: i64,
    pub code: String,
    pub discount_percentage: i32,
    pub active: bool,
}
