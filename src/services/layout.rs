//! layout.rs
//!
//! Генератор схемы зала. Чистая функция без обращений к БД:
//! по числу рядов, мест в ряду и ценам уровней строит полный набор мест
//! с детерминированным распределением по уровням и нормализованными
//! координатами для отрисовки карты зала.
//!
//! Правило уровней по рядам: A-B = VIP, C-E = STANDARD, F и дальше = ECONOMY.

use crate::error::BookingError;
use crate::models::seat::tier;

// Однобуквенные метки рядов: больше 26 рядов не поддерживаем
pub const MAX_ROWS: u32 = 26;
// Защита от случайной генерации гигантского зала
pub const MAX_SEATS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierPrices {
    pub vip: f64,
    pub standard: f64,
    pub economy: f64,
}

impl Default for TierPrices {
    fn default() -> Self {
        TierPrices {
            vip: 100.0,
            standard: 75.0,
            economy: 50.0,
        }
    }
}

impl TierPrices {
    /// Собирает цены из необязательных полей запроса. Единая цена
    /// `single` перекрывает значения по умолчанию для всех уровней.
    pub fn resolve(
        vip: Option<f64>,
        standard: Option<f64>,
        economy: Option<f64>,
        single: Option<f64>,
    ) -> Self {
        let defaults = TierPrices::default();
        TierPrices {
            vip: vip.or(single).unwrap_or(defaults.vip),
            standard: standard.or(single).unwrap_or(defaults.standard),
            economy: economy.or(single).unwrap_or(defaults.economy),
        }
    }

    fn for_row(&self, row_index: u32) -> (&'static str, f64) {
        if row_index < 2 {
            (tier::VIP, self.vip)
        } else if row_index < 5 {
            (tier::STANDARD, self.standard)
        } else {
            (tier::ECONOMY, self.economy)
        }
    }
}

/// Заготовка места до вставки в БД.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSeat {
    pub row_label: String,
    pub seat_number: i32,
    pub tier: &'static str,
    pub price: f64,
    pub x_coordinate: f64,
    pub y_coordinate: f64,
}

/// Строит схему зала `rows` x `cols`. Детерминирована: одинаковый вход
/// всегда дает одинаковый набор мест. Координаты распределяются равномерно
/// по холсту в диапазоне [5, 95) независимо от размера сетки.
pub fn generate_layout(
    rows: u32,
    cols: u32,
    prices: &TierPrices,
) -> Result<Vec<NewSeat>, BookingError> {
    if rows == 0 || cols == 0 {
        return Err(BookingError::InvalidRequest(
            "seat_rows и seat_cols должны быть больше нуля".to_string(),
        ));
    }
    if rows > MAX_ROWS {
        return Err(BookingError::InvalidRequest(format!(
            "Поддерживается не более {} рядов",
            MAX_ROWS
        )));
    }
    if rows as u64 * cols as u64 > MAX_SEATS as u64 {
        return Err(BookingError::InvalidRequest(format!(
            "Схема зала не может превышать {} мест",
            MAX_SEATS
        )));
    }

    let x_step = 90.0 / cols as f64;
    let y_step = 90.0 / rows as f64;

    let mut seats = Vec::with_capacity((rows * cols) as usize);
    for r in 0..rows {
        let row_label = char::from(b'A' + r as u8).to_string();
        let (tier, price) = prices.for_row(r);

        for c in 0..cols {
            seats.push(NewSeat {
                row_label: row_label.clone(),
                seat_number: (c + 1) as i32,
                tier,
                price,
                x_coordinate: 5.0 + c as f64 * x_step,
                y_coordinate: 5.0 + r as f64 * y_step,
            });
        }
    }

    Ok(seats)
}
