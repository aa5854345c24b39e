use std::{net, path::PathBuf, time};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    pub db: Db,
    pub http: Http,
    pub jwt: Jwt,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub uploads: Uploads,
    #[serde(default)]
    pub events: Events,
}

#[derive(Deserialize)]
pub struct Db {
    /// PostgreSQL connection string, or `memory:` for the in-process store.
    pub url: String,
    /// Inserts the demo accounts and assets on startup when missing.
    #[serde(default)]
    pub seed: bool,
}

impl Db {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory:")
    }
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize)]
pub struct Jwt {
    pub secret: String,
    #[serde(default = "one_hour", with = "humantime_serde")]
    pub expiration_time: time::Duration,
}

#[derive(Deserialize)]
pub struct Auth {
    #[serde(default = "one_hour", with = "humantime_serde")]
    pub reset_token_ttl: time::Duration,
    /// bcrypt work factor for newly stored passwords.
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            reset_token_ttl: one_hour(),
            password_hash_cost: default_password_hash_cost(),
        }
    }
}

#[derive(Deserialize)]
pub struct Uploads {
    #[serde(default = "default_uploads_dir")]
    pub dir: PathBuf,
    /// Maximum request body size for uploads, in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_size: usize,
}

impl Default for Uploads {
    fn default() -> Self {
        Self {
            dir: default_uploads_dir(),
            max_size: default_max_upload_size(),
        }
    }
}

#[derive(Deserialize)]
pub struct Events {
    /// Number of ticket events buffered per subscriber before it starts
    /// skipping.
    #[serde(default = "default_events_capacity")]
    pub capacity: usize,
}

impl Default for Events {
    fn default() -> Self {
        Self {
            capacity: default_events_capacity(),
        }
    }
}

fn one_hour() -> time::Duration {
    time::Duration::from_secs(60 * 60)
}

fn default_password_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_size() -> usize {
    10 * 1024 * 1024
}

fn default_events_capacity() -> usize {
    64
}
