use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Promotion {
    pub promotion_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: Option<i32>,
    pub valid_until: NaiveDate,
    pub featured: bool,
}
