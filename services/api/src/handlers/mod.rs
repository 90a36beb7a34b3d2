pub mod auth;
pub mod event;
pub mod space;
pub mod upload;
pub mod user;
