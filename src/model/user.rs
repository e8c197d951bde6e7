use serde::{Deserialize, Serialize};

use super::employee::EmpId;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub empid: Option<EmpId>,
    pub is_active: bool,
}
