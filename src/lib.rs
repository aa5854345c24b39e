pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod http;

pub use self::config::Config;
