pub mod auth;
pub mod event;
pub mod password;
pub mod space;
pub mod token;
pub mod upload;
pub mod user;
pub mod verification;
