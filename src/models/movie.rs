use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Movie {
    pub movie_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<f64>,
    pub age_rating: Option<String>,
    pub director: Option<String>,
    pub cast_members: Option<String>,
    pub duration_minutes: Option<i32>,
    pub poster_url: Option<String>,
    pub features: Option<Vec<String>>,
    pub release_date: Option<NaiveDate>,
}
