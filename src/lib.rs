pub mod config;
pub mod export;
pub mod http_client;
pub mod page_cache;
pub mod player;
pub mod ratings_fetch;
