pub mod cache;
pub mod db;
pub mod email;
pub mod google;
pub mod storage;
