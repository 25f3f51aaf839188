pub mod convert;
mod gateway;
pub mod models;
pub mod oauth;
pub mod token;

pub use gateway::GoogleCalendarGateway;
pub use models::CalendarEvent;
pub use token::{AccessTokenSource, StaticToken, TokenManager};
