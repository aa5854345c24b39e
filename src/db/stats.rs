use async_trait::async_trait;

use super::{asset, ticket, Client, Error};

/// Live grouped counts; groups with no rows are omitted.
#[async_trait]
pub trait Stats {
    async fn count_tickets_by_status(
        &self,
    ) -> Result<Vec<(ticket::Status, usize)>, Error>;

    async fn count_tickets_by_priority(
        &self,
    ) -> Result<Vec<(ticket::Priority, usize)>, Error>;

    async fn count_assets_by_status(
        &self,
    ) -> Result<Vec<(asset::Status, usize)>, Error>;
}

#[async_trait]
impl Stats for Client {
    async fn count_tickets_by_status(
        &self,
    ) -> Result<Vec<(ticket::Status, usize)>, Error> {
        const SQL: &str = "SELECT status, COUNT(*) FROM tickets \
                           GROUP BY status";
        Ok(self
            .0
            .query(SQL, &[])
            .await?
            .into_iter()
            .map(|row| (row.get(0), count(row.get(1))))
            .collect())
    }

    async fn count_tickets_by_priority(
        &self,
    ) -> Result<Vec<(ticket::Priority, usize)>, Error> {
        const SQL: &str = "SELECT priority, COUNT(*) FROM tickets \
                           GROUP BY priority";
        Ok(self
            .0
            .query(SQL, &[])
            .await?
            .into_iter()
            .map(|row| (row.get(0), count(row.get(1))))
            .collect())
    }

    async fn count_assets_by_status(
        &self,
    ) -> Result<Vec<(asset::Status, usize)>, Error> {
        const SQL: &str = "SELECT status, COUNT(*) FROM assets \
                           GROUP BY status";
        Ok(self
            .0
            .query(SQL, &[])
            .await?
            .into_iter()
            .map(|row| (row.get(0), count(row.get(1))))
            .collect())
    }
}

/// `COUNT(*)` is never negative.
fn count(n: i64) -> usize {
    usize::try_from(n).unwrap_or_default()
}
