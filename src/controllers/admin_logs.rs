//! admin_logs.rs
//!
//! Просмотр журнала действий для административной панели.
//! Доступно только администраторам.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::middleware::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/logs", get(list_action_logs))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    page: Option<u32>,
    #[serde(rename = "pageSize")]
    page_size: Option<u32>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct ActionLogRow {
    id: i64,
    user: String,
    action: String,
    details: Option<String>,
    timestamp: NaiveDateTime,
}

// GET /api/admin/logs - свежие записи первыми
async fn list_action_logs(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<LogsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !user.is_admin() {
        return Err((StatusCode::FORBIDDEN, "Требуются права администратора".to_string()));
    }

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(50).clamp(1, 200);
    let offset = (page - 1) * page_size;

    let logs = sqlx::query_as::<_, ActionLogRow>(
        r#"
        SELECT a.id, u.username AS "user", a.action, a.details, a.timestamp
        FROM action_logs a
        JOIN users u ON u.user_id = a.user_id
        ORDER BY a.timestamp DESC, a.id DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(page_size as i64)
    .bind(offset as i64)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("list_action_logs sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить журнал действий".to_string())
    })?;

    Ok(Json(logs))
}
