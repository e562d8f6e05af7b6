//! Watermark repository.

use tp_core::{EntityType, Watermark};

use crate::Ledger;
use crate::error::LedgerError;
use crate::helpers::{parse_datetime, parse_enum};

impl Ledger {
    /// Last successful sync point of `entity`, if any.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the query fails or the stored value is corrupt.
    pub async fn watermark(&self, entity: EntityType) -> Result<Option<Watermark>, LedgerError> {
        let mut rows = self
            .conn
            .query(
                "SELECT watermark FROM watermarks WHERE entity_type = ?1",
                [entity.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Watermark(parse_datetime(&row.get::<String>(0)?)?))),
            None => Ok(None),
        }
    }

    /// Every stored watermark, in dependency order.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the query fails or a stored value is corrupt.
    pub async fn watermarks(&self) -> Result<Vec<(EntityType, Watermark)>, LedgerError> {
        let mut rows = self
            .conn
            .query("SELECT entity_type, watermark FROM watermarks", ())
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let entity: EntityType = parse_enum(&row.get::<String>(0)?)?;
            out.push((entity, Watermark(parse_datetime(&row.get::<String>(1)?)?)));
        }
        out.sort_by_key(|(entity, _)| *entity);
        Ok(out)
    }

    /// Record `watermark` as the last successful sync point of `entity`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the write fails.
    pub async fn advance_watermark(
        &self,
        entity: EntityType,
        watermark: Watermark,
    ) -> Result<(), LedgerError> {
        self.conn
            .execute(
                "INSERT INTO watermarks (entity_type, watermark, updated_at)
                 VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(entity_type) DO UPDATE SET
                     watermark = excluded.watermark,
                     updated_at = excluded.updated_at",
                libsql::params![entity.as_str(), watermark.at().to_rfc3339()],
            )
            .await?;
        tracing::debug!(%entity, watermark = %watermark.at(), "watermark advanced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn wm(s: &str) -> Watermark {
        Watermark(DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc))
    }

    #[tokio::test]
    async fn missing_watermark_is_none() {
        let ledger = Ledger::open_local(":memory:").await.unwrap();
        assert_eq!(ledger.watermark(EntityType::Voucher).await.unwrap(), None);
    }

    #[tokio::test]
    async fn advance_overwrites() {
        let ledger = Ledger::open_local(":memory:").await.unwrap();
        ledger
            .advance_watermark(EntityType::Voucher, wm("2024-04-01T00:00:00Z"))
            .await
            .unwrap();
        ledger
            .advance_watermark(EntityType::Voucher, wm("2024-05-01T12:30:00Z"))
            .await
            .unwrap();
        assert_eq!(
            ledger.watermark(EntityType::Voucher).await.unwrap(),
            Some(wm("2024-05-01T12:30:00Z"))
        );
    }

    #[tokio::test]
    async fn watermarks_come_back_in_dependency_order() {
        let ledger = Ledger::open_local(":memory:").await.unwrap();
        ledger
            .advance_watermark(EntityType::VoucherEntry, wm("2024-05-01T00:00:00Z"))
            .await
            .unwrap();
        ledger
            .advance_watermark(EntityType::Company, wm("2024-05-01T00:00:00Z"))
            .await
            .unwrap();
        let entities: Vec<EntityType> = ledger
            .watermarks()
            .await
            .unwrap()
            .into_iter()
            .map(|(e, _)| e)
            .collect();
        assert_eq!(entities, vec![EntityType::Company, EntityType::VoucherEntry]);
    }
}
