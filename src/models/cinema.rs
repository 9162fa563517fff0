use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cinema {
    pub cinema_id: i32,
    pub name: String,
    pub city: String,
    pub address: Option<String>,
}
