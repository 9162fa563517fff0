pub mod user;
pub mod movie;
pub mod cinema;
pub mod showtime;
pub mod booking;
pub mod event;
pub mod promotion;

pub use user::User;
pub use movie::Movie;
pub use cinema::Cinema;
pub use showtime::Showtime;
pub use booking::Booking;
pub use event::Event;
pub use promotion::Promotion;
