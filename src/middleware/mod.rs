use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::models::{user::role, Event, Seat, Ticket, User};
use crate::services::audit::actions;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_organizer(&self) -> bool {
        self.role == role::ORGANIZER || self.is_admin()
    }

    pub fn is_admin(&self) -> bool {
        self.role == role::ADMIN
    }
}

// Basic Auth extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Получаем заголовок Authorization
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let encoded = auth_header
            .strip_prefix("Basic ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        let credentials =
            String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

        // Разделяем username:password
        let mut parts = credentials.splitn(2, ':');
        let username = parts.next().ok_or(StatusCode::UNAUTHORIZED)?;
        let password = parts.next().ok_or(StatusCode::UNAUTHORIZED)?;

        let user = User::find_by_username(username, &state.db.pool)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        if !user.verify_password(password) {
            return Err(StatusCode::UNAUTHORIZED);
        }

        // Обновляем last_logged_in, ошибку игнорируем
        sqlx::query("UPDATE users SET last_logged_in = NOW() WHERE user_id = $1")
            .bind(user.user_id)
            .execute(&state.db.pool)
            .await
            .ok();

        state.audit.record(
            user.user_id,
            actions::LOGIN,
            "User logged in successfully".to_string(),
        );

        Ok(AuthUser {
            user_id: user.user_id,
            username: user.username,
            role: user.role,
        })
    }
}

/// Явный полиморфный интерфейс авторизации вместо проверки атрибутов
/// во время выполнения: каждый вид ресурса сам решает, кто может его менять.
pub trait WriteAccess {
    fn can_write(&self, actor: &AuthUser) -> bool;
}

impl WriteAccess for Event {
    fn can_write(&self, actor: &AuthUser) -> bool {
        actor.is_admin() || self.organizer_id == actor.user_id
    }
}

impl WriteAccess for Ticket {
    fn can_write(&self, actor: &AuthUser) -> bool {
        actor.is_admin() || self.customer_id == actor.user_id
    }
}

/// Место само по себе не хранит организатора: право записи определяется
/// событием-владельцем.
pub struct SeatInEvent<'a> {
    pub seat: &'a Seat,
    pub event: &'a Event,
}

impl WriteAccess for SeatInEvent<'_> {
    fn can_write(&self, actor: &AuthUser) -> bool {
        debug_assert_eq!(self.seat.event_id, self.event.id);
        self.event.can_write(actor)
    }
}
