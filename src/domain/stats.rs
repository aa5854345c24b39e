use std::{collections::HashMap, hash::Hash};

use crate::{
    api::stats::{Bucket, Overview},
    db::{asset, ticket},
};

/// Folds grouped counts into the dashboard overview.
///
/// Every status and priority gets a bucket, zero included, in declaration
/// order. Totals are derived from the same counts so the figures always
/// agree with each other.
pub fn overview(
    tickets_by_status: Vec<(ticket::Status, usize)>,
    tickets_by_priority: Vec<(ticket::Priority, usize)>,
    assets_by_status: Vec<(asset::Status, usize)>,
) -> Overview {
    let tickets_by_status = buckets(&ticket::Status::ALL, tickets_by_status);
    let total_tickets = tickets_by_status.iter().map(|b| b.value).sum();
    let open_tickets = tickets_by_status
        .iter()
        .filter(|b| !b.name.is_resolution())
        .map(|b| b.value)
        .sum();
    let resolved_tickets = tickets_by_status
        .iter()
        .filter(|b| b.name == ticket::Status::Resolved)
        .map(|b| b.value)
        .sum();

    let assets_by_status = buckets(&asset::Status::ALL, assets_by_status);
    let total_assets = assets_by_status.iter().map(|b| b.value).sum();

    Overview {
        total_tickets,
        open_tickets,
        resolved_tickets,
        tickets_by_status,
        tickets_by_priority: buckets(
            &ticket::Priority::ALL,
            tickets_by_priority,
        ),
        total_assets,
        assets_by_status,
    }
}

fn buckets<T>(all: &[T], counts: Vec<(T, usize)>) -> Vec<Bucket<T>>
where
    T: Copy + Eq + Hash,
{
    let mut counts = counts.into_iter().collect::<HashMap<_, _>>();
    all.iter()
        .map(|&name| Bucket {
            name,
            value: counts.remove(&name).unwrap_or_default(),
        })
        .collect()
}
