use serde::Serialize;
use sqlx::FromRow;
use chrono::NaiveDateTime;

pub mod role {
    pub const ORGANIZER: &str = "ORGANIZER";
    pub const CUSTOMER: &str = "CUSTOMER";
    pub const ADMIN: &str = "ADMIN";
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub registered_at: NaiveDateTime,
    pub last_logged_in: Option<NaiveDateTime>,
}

impl User {
    // Найти активного пользователя по имени
    pub async fn find_by_username(
        username: &str,
        pool: &sqlx::PgPool,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 AND is_active = true",
        )
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}
