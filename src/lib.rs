pub mod config;
pub mod controllers;
pub mod database;
pub mod middleware;
pub mod models;
pub mod reservation;
pub mod services;

use std::sync::Arc;

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub engine: reservation::ReservationEngine,
    pub assistant: services::assistant::AssistantService,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;

        db.run_migrations().await?;

        let engine = reservation::ReservationEngine::new(db.pool.clone());
        let assistant = services::assistant::AssistantService::new(&config.assistant, db.pool.clone());

        Ok(Arc::new(Self {
            db,
            engine,
            assistant,
            config,
        }))
    }
}
