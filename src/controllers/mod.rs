pub mod auth;
pub mod bookings;
pub mod chat;
pub mod cinemas;
pub mod events;
pub mod movies;
pub mod promotions;
pub mod showtimes;
pub mod users;

use axum::Router;
use std::sync::Arc;

use crate::config::FeatureFlags;

pub fn routes(features: &FeatureFlags) -> Router<Arc<crate::AppState>> {
    let mut router = Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(movies::routes())
        .merge(cinemas::routes())
        .merge(showtimes::routes())
        .merge(bookings::routes())
        .merge(promotions::routes())
        .merge(events::routes());

    if features.enable_assistant {
        router = router.merge(chat::routes());
    }

    router
}
