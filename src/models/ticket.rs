use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::NaiveDateTime;

pub mod payment_status {
    pub const PENDING: &str = "PENDING";
    pub const COMPLETED: &str = "COMPLETED";
    pub const FAILED: &str = "FAILED";
}

// Билет связан с местом один-к-одному. Уникальность обеспечивается
// и схемой БД, и самим движком бронирования под блокировкой.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub customer_id: i64,
    pub event_id: i64,
    pub seat_id: i64,
    pub payment_status: String,
    pub transaction_id: Option<String>,
    pub qr_code: Option<String>,
    pub purchase_date: NaiveDateTime,
}
