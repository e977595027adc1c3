// Services module - Business logic

pub mod clock;
pub mod reports;
pub mod resolver;
