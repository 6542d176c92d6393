//! `MediaRegistry` over the `media_files` table.

use super::models::{CategoryTotalsRow, MediaChangeset, MediaFileRow, NewMediaFileRow};
use super::schema::media_files;
use super::{PostgresRegistry, like_pattern, query_error, to_i64, to_u64};
use crate::{MediaRegistry, media_not_found};
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind as DieselErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Nullable};
use vellum_core::{
    Fingerprint, MediaCategory, MediaFile, MediaFilter, MediaId, MediaPatch, MediaStats,
    MediaStatus, NewMediaFile, Page, PageRequest, UploaderId,
};
use vellum_error::{MediaError, MediaErrorKind, VellumResult};

fn into_media(row: MediaFileRow) -> VellumResult<MediaFile> {
    Ok(MediaFile::try_from(row)?)
}

/// Boxed query with every filter criterion applied, without paging.
fn filtered(filter: &MediaFilter) -> media_files::BoxedQuery<'static, Pg> {
    let mut query = media_files::table.into_boxed();

    if let Some(category) = filter.category {
        query = query.filter(media_files::category.eq(category.as_str()));
    }
    if let Some(uploader) = filter.uploader_id {
        query = query.filter(media_files::uploader_id.eq(uploader));
    }
    if let Some(status) = filter.status {
        query = query.filter(media_files::status.eq(status.as_str()));
    }
    if let Some(is_public) = filter.is_public {
        query = query.filter(media_files::is_public.eq(is_public));
    }
    if let Some(min) = filter.min_size {
        query = query.filter(media_files::size_bytes.ge(to_i64(min)));
    }
    if let Some(max) = filter.max_size {
        query = query.filter(media_files::size_bytes.le(to_i64(max)));
    }
    if let Some(after) = filter.created_after {
        query = query.filter(media_files::created_at.ge(after));
    }
    if let Some(before) = filter.created_before {
        query = query.filter(media_files::created_at.le(before));
    }
    if let Some(keyword) = filter.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        let pattern = like_pattern(keyword);
        query = query.filter(
            media_files::filename
                .ilike(pattern.clone())
                .or(media_files::alt.ilike(pattern.clone()))
                .or(media_files::caption.ilike(pattern)),
        );
    }

    query
}

fn load_page(conn: &mut PgConnection, filter: &MediaFilter) -> VellumResult<Page<MediaFile>> {
    let total = filtered(filter)
        .count()
        .get_result::<i64>(conn)
        .map_err(query_error)?;

    let rows = filtered(filter)
        .select(MediaFileRow::as_select())
        .order((media_files::created_at.desc(), media_files::id.desc()))
        .limit(i64::from(filter.page.per_page()))
        .offset(to_i64(filter.page.offset()))
        .load::<MediaFileRow>(conn)
        .map_err(query_error)?;

    Ok(Page {
        items: rows.into_iter().map(into_media).collect::<VellumResult<_>>()?,
        total: to_u64(total),
        request: filter.page,
    })
}

fn set_status(conn: &mut PgConnection, id: MediaId, status: MediaStatus) -> VellumResult<MediaFile> {
    diesel::update(media_files::table.find(id))
        .set((
            media_files::status.eq(status.as_str()),
            media_files::updated_at.eq(Utc::now()),
        ))
        .returning(MediaFileRow::as_returning())
        .get_result::<MediaFileRow>(conn)
        .optional()
        .map_err(query_error)?
        .ok_or_else(|| media_not_found(id))
        .and_then(into_media)
}

fn find(conn: &mut PgConnection, id: MediaId) -> VellumResult<MediaFile> {
    media_files::table
        .find(id)
        .select(MediaFileRow::as_select())
        .first::<MediaFileRow>(conn)
        .optional()
        .map_err(query_error)?
        .ok_or_else(|| media_not_found(id))
        .and_then(into_media)
}

#[async_trait]
impl MediaRegistry for PostgresRegistry {
    #[tracing::instrument(skip(self, new), fields(fingerprint = %new.fingerprint))]
    async fn create(&self, new: NewMediaFile) -> VellumResult<MediaFile> {
        let fingerprint = new.fingerprint.to_string();
        let row = NewMediaFileRow::from(new);
        self.with_conn(move |conn| {
            let inserted = diesel::insert_into(media_files::table)
                .values(&row)
                .returning(MediaFileRow::as_returning())
                .get_result::<MediaFileRow>(conn);
            match inserted {
                Ok(row) => {
                    tracing::debug!(id = row.id, "Registered media");
                    into_media(row)
                }
                Err(DieselError::DatabaseError(DieselErrorKind::UniqueViolation, _)) => {
                    tracing::debug!("Fingerprint already registered");
                    Err(MediaError::new(MediaErrorKind::DuplicateFingerprint(fingerprint)).into())
                }
                Err(e) => Err(query_error(e)),
            }
        })
        .await
    }

    async fn get_by_id(&self, id: MediaId) -> VellumResult<MediaFile> {
        self.with_conn(move |conn| find(conn, id)).await
    }

    async fn get_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> VellumResult<Option<MediaFile>> {
        let fingerprint = fingerprint.to_string();
        self.with_conn(move |conn| {
            media_files::table
                .filter(media_files::fingerprint.eq(fingerprint))
                .select(MediaFileRow::as_select())
                .first::<MediaFileRow>(conn)
                .optional()
                .map_err(query_error)?
                .map(into_media)
                .transpose()
        })
        .await
    }

    async fn update(&self, id: MediaId, patch: &MediaPatch) -> VellumResult<MediaFile> {
        if patch.is_empty() {
            return self.get_by_id(id).await;
        }
        let changes = MediaChangeset::from(patch);
        self.with_conn(move |conn| {
            diesel::update(media_files::table.find(id))
                .set(&changes)
                .returning(MediaFileRow::as_returning())
                .get_result::<MediaFileRow>(conn)
                .optional()
                .map_err(query_error)?
                .ok_or_else(|| media_not_found(id))
                .and_then(into_media)
        })
        .await
    }

    async fn soft_delete(&self, id: MediaId) -> VellumResult<MediaFile> {
        self.with_conn(move |conn| set_status(conn, id, MediaStatus::Deleted))
            .await
    }

    async fn restore(&self, id: MediaId) -> VellumResult<MediaFile> {
        self.with_conn(move |conn| set_status(conn, id, MediaStatus::Active))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn hard_delete(&self, id: MediaId) -> VellumResult<()> {
        self.with_conn(move |conn| {
            match diesel::delete(media_files::table.find(id)).execute(conn) {
                Ok(0) => Err(media_not_found(id)),
                Ok(_) => {
                    tracing::debug!("Removed media row");
                    Ok(())
                }
                Err(DieselError::DatabaseError(DieselErrorKind::ForeignKeyViolation, _)) => {
                    Err(MediaError::new(MediaErrorKind::InvalidState(format!(
                        "media {} is still referenced",
                        id
                    )))
                    .into())
                }
                Err(e) => Err(query_error(e)),
            }
        })
        .await
    }

    async fn list(&self, filter: &MediaFilter) -> VellumResult<Page<MediaFile>> {
        let filter = filter.clone();
        self.with_conn(move |conn| load_page(conn, &filter)).await
    }

    async fn search(&self, keyword: &str, page: PageRequest) -> VellumResult<Page<MediaFile>> {
        let filter = MediaFilter {
            status: Some(MediaStatus::Active),
            keyword: Some(keyword.to_string()),
            page,
            ..Default::default()
        };
        self.with_conn(move |conn| load_page(conn, &filter)).await
    }

    async fn stats(&self, uploader_id: Option<UploaderId>) -> VellumResult<MediaStats> {
        self.with_conn(move |conn| {
            let rows = diesel::sql_query(
                "SELECT category, COUNT(*) AS count, COALESCE(SUM(size_bytes), 0)::BIGINT AS total_bytes \
                 FROM media_files \
                 WHERE status = 'active' AND ($1::BIGINT IS NULL OR uploader_id = $1) \
                 GROUP BY category",
            )
            .bind::<Nullable<BigInt>, _>(uploader_id)
            .load::<CategoryTotalsRow>(conn)
            .map_err(query_error)?;

            let mut stats = MediaStats::default();
            for row in rows {
                let category = row
                    .category
                    .parse::<MediaCategory>()
                    .unwrap_or(MediaCategory::Other);
                stats.add(category, to_u64(row.count), to_u64(row.total_bytes));
            }
            Ok(stats)
        })
        .await
    }

    async fn list_recent(&self, limit: usize) -> VellumResult<Vec<MediaFile>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            media_files::table
                .filter(media_files::status.eq(MediaStatus::Active.as_str()))
                .filter(media_files::is_public.eq(true))
                .select(MediaFileRow::as_select())
                .order((media_files::created_at.desc(), media_files::id.desc()))
                .limit(limit)
                .load::<MediaFileRow>(conn)
                .map_err(query_error)?
                .into_iter()
                .map(into_media)
                .collect()
        })
        .await
    }
}
