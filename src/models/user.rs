use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
    pub user_id: String,
    pub expires_at: NaiveDateTime,
}
