//! Policy layer: defaults, lifecycle rules and audit snapshots, independent
//! of storage and HTTP.

pub mod ai;
pub mod asset;
pub mod stats;
pub mod ticket;

use derive_more::Display;
use serde::{Deserialize, Deserializer};
use time::{Duration, OffsetDateTime};

/// Input rejected by a domain rule.
#[derive(Clone, Copy, Debug, Display, PartialEq)]
pub struct Invalid(pub &'static str);

impl std::error::Error for Invalid {}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field
/// (`None`, via `#[serde(default)]`).
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Current UTC time at the microsecond precision storage keeps, so a value
/// handed out in a response equals the one read back later.
pub fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - Duration::nanoseconds(i64::from(now.nanosecond() % 1_000))
}

fn require(value: &str, what: &'static str) -> Result<(), Invalid> {
    if value.trim().is_empty() {
        Err(Invalid(what))
    } else {
        Ok(())
    }
}
