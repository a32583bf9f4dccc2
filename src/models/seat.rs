use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Статусы места. RESERVED зарезервирован под будущую функциональность
// временного удержания мест (корзина с таймаутом) и здесь не используется.
pub mod status {
    pub const AVAILABLE: &str = "AVAILABLE";
    pub const BOOKED: &str = "BOOKED";
    pub const RESERVED: &str = "RESERVED";
}

pub mod tier {
    pub const VIP: &str = "VIP";
    pub const STANDARD: &str = "STANDARD";
    pub const ECONOMY: &str = "ECONOMY";
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub event_id: i64,
    pub row_label: String,
    pub seat_number: i32,
    pub status: String,
    pub price: f64,
    pub tier: Option<String>,
    pub x_coordinate: f64,
    pub y_coordinate: f64,
}

impl Seat {
    // Человекочитаемая метка места, например "A1"
    pub fn label(&self) -> String {
        format!("{}{}", self.row_label, self.seat_number)
    }

    pub fn is_available(&self) -> bool {
        self.status == status::AVAILABLE
    }
}
