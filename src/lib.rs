pub mod api_football;
pub mod backoff;
pub mod combine;
pub mod config;
pub mod error;
pub mod extract;
pub mod flatten;
pub mod http_client;
pub mod normalize;
pub mod seasons;
pub mod storage;
