//! `UsageTracker` over the `media_usages` table.

use super::models::{
    MediaFileRow, MediaUsageCountRow, MediaUsageRow, NewMediaUsageRow, UsageTypeCountRow,
};
use super::schema::{media_files, media_usages};
use super::{PostgresRegistry, query_error, to_i64, to_u64};
use crate::{AGGREGATE_LIMIT, MediaLock, UsageTracker, media_not_found};
use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind as DieselErrorKind, Error as DieselError};
use diesel::sql_types::BigInt;
use std::collections::HashMap;
use vellum_core::{
    MediaFile, MediaId, MediaUsage, MediaUsageCount, NewMediaUsage, Page, UsageFilter, UsageId,
    UsageStats,
};
use vellum_error::VellumResult;

fn by_target(usage_type: &str, target_id: Option<i64>) -> media_usages::BoxedQuery<'static, Pg> {
    let query = media_usages::table
        .filter(media_usages::usage_type.eq(usage_type.to_string()))
        .into_boxed();
    match target_id {
        Some(target) => query.filter(media_usages::target_id.eq(target)),
        None => query.filter(media_usages::target_id.is_null()),
    }
}

fn filtered_usages(filter: &UsageFilter) -> media_usages::BoxedQuery<'static, Pg> {
    let mut query = media_usages::table.into_boxed();
    if let Some(media_id) = filter.media_id {
        query = query.filter(media_usages::media_id.eq(media_id));
    }
    if let Some(usage_type) = &filter.usage_type {
        query = query.filter(media_usages::usage_type.eq(usage_type.clone()));
    }
    if let Some(uploader_id) = filter.uploader_id {
        query = query.filter(media_usages::uploader_id.eq(uploader_id));
    }
    query
}

fn load_usages(
    conn: &mut PgConnection,
    query: media_usages::BoxedQuery<'static, Pg>,
) -> VellumResult<Vec<MediaUsage>> {
    Ok(query
        .select(MediaUsageRow::as_select())
        .order(media_usages::id.asc())
        .load::<MediaUsageRow>(conn)
        .map_err(query_error)?
        .into_iter()
        .map(MediaUsage::from)
        .collect())
}

fn top_media(conn: &mut PgConnection) -> VellumResult<Vec<MediaUsageCount>> {
    let counts = diesel::sql_query(
        "SELECT u.media_id, COUNT(*) AS usage_count \
         FROM media_usages u JOIN media_files m ON m.id = u.media_id \
         WHERE m.status = 'active' \
         GROUP BY u.media_id \
         ORDER BY usage_count DESC, u.media_id ASC \
         LIMIT $1",
    )
    .bind::<BigInt, _>(AGGREGATE_LIMIT as i64)
    .load::<MediaUsageCountRow>(conn)
    .map_err(query_error)?;

    let ids: Vec<i64> = counts.iter().map(|c| c.media_id).collect();
    let mut media: HashMap<MediaId, MediaFile> = media_files::table
        .filter(media_files::id.eq_any(ids))
        .select(MediaFileRow::as_select())
        .load::<MediaFileRow>(conn)
        .map_err(query_error)?
        .into_iter()
        .map(|row| MediaFile::try_from(row).map(|m| (m.id, m)))
        .collect::<Result<_, _>>()?;

    Ok(counts
        .into_iter()
        .filter_map(|count| {
            media.remove(&count.media_id).map(|media| MediaUsageCount {
                media,
                usage_count: to_u64(count.usage_count),
            })
        })
        .collect())
}

#[async_trait]
impl UsageTracker for PostgresRegistry {
    async fn lock_media(&self, media_id: MediaId) -> MediaLock {
        self.locks.lock(media_id).await
    }

    #[tracing::instrument(skip(self, usage), fields(media_id = usage.media_id, usage_type = %usage.usage_type))]
    async fn create_usage(&self, usage: NewMediaUsage) -> VellumResult<MediaUsage> {
        let _lock = self.locks.lock(usage.media_id).await;
        let media_id = usage.media_id;
        let row = NewMediaUsageRow::from(usage);
        self.with_conn(move |conn| {
            let inserted = diesel::insert_into(media_usages::table)
                .values(&row)
                .returning(MediaUsageRow::as_returning())
                .get_result::<MediaUsageRow>(conn);
            match inserted {
                Ok(row) => {
                    tracing::debug!(id = row.id, "Recorded usage");
                    Ok(MediaUsage::from(row))
                }
                Err(DieselError::DatabaseError(DieselErrorKind::ForeignKeyViolation, _)) => {
                    Err(media_not_found(media_id))
                }
                Err(e) => Err(query_error(e)),
            }
        })
        .await
    }

    async fn list_by_media(&self, media_id: MediaId) -> VellumResult<Vec<MediaUsage>> {
        self.with_conn(move |conn| {
            let query = media_usages::table
                .filter(media_usages::media_id.eq(media_id))
                .into_boxed();
            load_usages(conn, query)
        })
        .await
    }

    async fn list_by_target(
        &self,
        usage_type: &str,
        target_id: Option<i64>,
    ) -> VellumResult<Vec<MediaUsage>> {
        let query = by_target(usage_type, target_id);
        self.with_conn(move |conn| load_usages(conn, query)).await
    }

    async fn list_usages(&self, filter: &UsageFilter) -> VellumResult<Page<MediaUsage>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let total = filtered_usages(&filter)
                .count()
                .get_result::<i64>(conn)
                .map_err(query_error)?;
            let items = filtered_usages(&filter)
                .select(MediaUsageRow::as_select())
                .order((media_usages::created_at.desc(), media_usages::id.desc()))
                .offset(to_i64(filter.page.offset()))
                .limit(i64::from(filter.page.per_page()))
                .load::<MediaUsageRow>(conn)
                .map_err(query_error)?
                .into_iter()
                .map(MediaUsage::from)
                .collect();
            Ok(Page {
                items,
                total: to_u64(total),
                request: filter.page,
            })
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_usage(&self, usage_id: UsageId) -> VellumResult<bool> {
        let media_id = self
            .with_conn(move |conn| {
                media_usages::table
                    .find(usage_id)
                    .select(media_usages::media_id)
                    .first::<i64>(conn)
                    .optional()
                    .map_err(query_error)
            })
            .await?;
        let Some(media_id) = media_id else {
            return Ok(false);
        };

        let _lock = self.locks.lock(media_id).await;
        let removed = self
            .with_conn(move |conn| {
                diesel::delete(media_usages::table.find(usage_id))
                    .execute(conn)
                    .map_err(query_error)
            })
            .await?;
        if removed > 0 {
            tracing::debug!(media_id, "Removed usage");
        }
        Ok(removed > 0)
    }

    async fn delete_by_media(&self, media_id: MediaId) -> VellumResult<u64> {
        self.with_conn(move |conn| {
            diesel::delete(media_usages::table.filter(media_usages::media_id.eq(media_id)))
                .execute(conn)
                .map(|n| n as u64)
                .map_err(query_error)
        })
        .await
    }

    async fn delete_by_target(
        &self,
        usage_type: &str,
        target_id: Option<i64>,
    ) -> VellumResult<u64> {
        let usage_type = usage_type.to_string();
        self.with_conn(move |conn| {
            let matching = media_usages::table.filter(media_usages::usage_type.eq(usage_type));
            let deleted = match target_id {
                Some(target) => {
                    diesel::delete(matching.filter(media_usages::target_id.eq(target)))
                        .execute(conn)
                }
                None => diesel::delete(matching.filter(media_usages::target_id.is_null()))
                    .execute(conn),
            };
            deleted.map(|n| n as u64).map_err(query_error)
        })
        .await
    }

    async fn count_by_media(&self, media_id: MediaId) -> VellumResult<u64> {
        self.with_conn(move |conn| {
            media_usages::table
                .filter(media_usages::media_id.eq(media_id))
                .count()
                .get_result::<i64>(conn)
                .map(to_u64)
                .map_err(query_error)
        })
        .await
    }

    async fn usage_stats(&self) -> VellumResult<UsageStats> {
        self.with_conn(|conn| {
            let total = media_usages::table
                .count()
                .get_result::<i64>(conn)
                .map_err(query_error)?;

            let by_type = diesel::sql_query(
                "SELECT usage_type, COUNT(*) AS count FROM media_usages GROUP BY usage_type",
            )
            .load::<UsageTypeCountRow>(conn)
            .map_err(query_error)?
            .into_iter()
            .map(|row| (row.usage_type, to_u64(row.count)))
            .collect();

            let recent = media_usages::table
                .select(MediaUsageRow::as_select())
                .order((media_usages::created_at.desc(), media_usages::id.desc()))
                .limit(AGGREGATE_LIMIT as i64)
                .load::<MediaUsageRow>(conn)
                .map_err(query_error)?
                .into_iter()
                .map(MediaUsage::from)
                .collect();

            Ok(UsageStats {
                total_usages: to_u64(total),
                by_type,
                top_media: top_media(conn)?,
                recent,
            })
        })
        .await
    }
}
