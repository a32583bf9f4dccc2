use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub booking: BookingConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки движка бронирования
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    // Ограничение ожидания блокировки мест (SET LOCAL lock_timeout).
    // Параметр развертывания, не инвариант протокола.
    pub lock_timeout_ms: u64,
    pub payment_mode: PaymentMode,
}

/// Режим оплаты при бронировании. Фактическое списание средств вне рамок
/// системы; точка расширения оставлена внутри транзакционной границы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// Бронирование сразу считается оплаченным (поведение по умолчанию).
    Settled,
    /// Билет создается со статусом PENDING до подтверждения оплаты.
    Pending,
}

impl PaymentMode {
    pub fn initial_status(&self) -> &'static str {
        match self {
            PaymentMode::Settled => crate::models::ticket::payment_status::COMPLETED,
            PaymentMode::Pending => crate::models::ticket::payment_status::PENDING,
        }
    }

    fn from_env_value(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => PaymentMode::Pending,
            _ => PaymentMode::Settled,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "ticket_manager=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            booking: BookingConfig {
                lock_timeout_ms: env::var("BOOKING_LOCK_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .expect("BOOKING_LOCK_TIMEOUT_MS must be a valid number"),
                payment_mode: PaymentMode::from_env_value(
                    &env::var("PAYMENT_MODE").unwrap_or_else(|_| "settled".to_string()),
                ),
            },
        }
    }
}
