//! Session record store and lifecycle management.

mod models;
mod repository;
mod service;

pub use models::{GameSession, GameStatus, SessionStatus, StartedGame};
pub use repository::SessionRepository;
pub use service::GameService;
