use std::collections::HashMap;

use async_trait::async_trait;
use rr_core::drafts::{TaxonDraft, TitleDraft};
use rr_core::error::{AppError, Result};
use rr_core::models::{Taxon, TaxonId, TaxonomyKind, Title, TitleId};
use rr_core::pagination::{NameOrdering, Page, PageParams, TaxonFilter, TitleFilter};
use rr_core::rating::rating_from_totals;
use rr_core::traits::CatalogRepo;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tracing::info;

use crate::{contains_pattern, db_err, SqliteRepo};

fn table(kind: TaxonomyKind) -> &'static str {
    match kind {
        TaxonomyKind::Category => "categories",
        TaxonomyKind::Genre => "genres",
    }
}

fn taxon_from_row(row: &SqliteRow) -> Result<Taxon> {
    Ok(Taxon {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        slug: row.try_get("slug").map_err(db_err)?,
    })
}

fn push_taxon_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TaxonFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND name LIKE ").push_bind(contains_pattern(search)).push(" ESCAPE '\\'");
    }
    if let Some(name) = &filter.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(slug) = &filter.slug {
        qb.push(" AND slug = ").push_bind(slug.clone());
    }
}

/// Aggregated columns are computed per row, so the rating always reflects the
/// review set at read time.
const TITLE_SELECT: &str = "SELECT t.id, t.name, t.year, t.description, \
     c.id AS category_id, c.name AS category_name, c.slug AS category_slug, \
     (SELECT COUNT(*) FROM reviews r WHERE r.title_id = t.id) AS review_count, \
     (SELECT COALESCE(SUM(r.score), 0) FROM reviews r WHERE r.title_id = t.id) AS score_sum \
     FROM titles t LEFT JOIN categories c ON c.id = t.category_id";

fn push_title_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TitleFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(name) = filter.name.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND t.name LIKE ").push_bind(contains_pattern(name)).push(" ESCAPE '\\'");
    }
    if let Some(year) = filter.year {
        qb.push(" AND t.year = ").push_bind(year);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND t.category_id IN (SELECT id FROM categories WHERE slug = ")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(genre) = &filter.genre {
        qb.push(
            " AND EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id \
             WHERE tg.title_id = t.id AND g.slug = ",
        )
        .push_bind(genre.clone())
        .push(")");
    }
}

/// A title row before its genres are attached.
fn title_from_row(row: &SqliteRow) -> Result<Title> {
    let category_id: Option<TaxonId> = row.try_get("category_id").map_err(db_err)?;
    let category = match category_id {
        Some(id) => Some(Taxon {
            id,
            name: row.try_get("category_name").map_err(db_err)?,
            slug: row.try_get("category_slug").map_err(db_err)?,
        }),
        None => None,
    };
    let review_count: i64 = row.try_get("review_count").map_err(db_err)?;
    let score_sum: i64 = row.try_get("score_sum").map_err(db_err)?;
    Ok(Title {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        year: row.try_get("year").map_err(db_err)?,
        rating: rating_from_totals(score_sum, review_count),
        description: row.try_get("description").map_err(db_err)?,
        genres: Vec::new(),
        category,
    })
}

/// Slug references of a draft, resolved to foreign keys.
struct ResolvedRefs {
    category_id: Option<TaxonId>,
    genre_ids: Vec<TaxonId>,
}

async fn resolve_refs(conn: &mut SqliteConnection, draft: &TitleDraft) -> Result<ResolvedRefs> {
    let category_id = match &draft.category {
        Some(slug) => {
            let id: Option<TaxonId> = sqlx::query_scalar("SELECT id FROM categories WHERE slug = ?")
                .bind(slug)
                .fetch_optional(&mut *conn)
                .await
                .map_err(db_err)?;
            Some(id.ok_or_else(|| missing_slug("category", slug))?)
        }
        None => None,
    };

    let mut genre_ids = Vec::with_capacity(draft.genre.len());
    for slug in &draft.genre {
        let id: Option<TaxonId> = sqlx::query_scalar("SELECT id FROM genres WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;
        genre_ids.push(id.ok_or_else(|| missing_slug("genre", slug))?);
    }

    Ok(ResolvedRefs { category_id, genre_ids })
}

fn missing_slug(field: &str, slug: &str) -> AppError {
    AppError::field(field, format!("Object with slug={} does not exist.", slug))
}

async fn link_genres(conn: &mut SqliteConnection, title_id: TitleId, genre_ids: &[TaxonId]) -> Result<()> {
    for genre_id in genre_ids {
        sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES (?, ?)")
            .bind(title_id)
            .bind(genre_id)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}

impl SqliteRepo {
    /// Fills in the genre sets of `titles` with a single query.
    async fn attach_genres(&self, titles: &mut [Title]) -> Result<()> {
        if titles.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT tg.title_id, g.id, g.name, g.slug FROM title_genres tg \
             JOIN genres g ON g.id = tg.genre_id WHERE tg.title_id IN (",
        );
        let mut ids = qb.separated(", ");
        for title in titles.iter() {
            ids.push_bind(title.id);
        }
        ids.push_unseparated(") ORDER BY g.name, g.id");
        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;

        let mut by_title: HashMap<TitleId, Vec<Taxon>> = HashMap::new();
        for row in &rows {
            let title_id: TitleId = row.try_get("title_id").map_err(db_err)?;
            by_title.entry(title_id).or_default().push(taxon_from_row(row)?);
        }
        for title in titles.iter_mut() {
            title.genres = by_title.remove(&title.id).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogRepo for SqliteRepo {
    async fn create_taxon(&self, kind: TaxonomyKind, draft: &TaxonDraft) -> Result<Taxon> {
        let sql = format!("INSERT INTO {} (name, slug) VALUES (?, ?)", table(kind));
        let id = sqlx::query(&sql)
            .bind(&draft.name)
            .bind(&draft.slug)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .last_insert_rowid();
        Ok(Taxon { id, name: draft.name.clone(), slug: draft.slug.clone() })
    }

    async fn find_taxon(&self, kind: TaxonomyKind, key: &str) -> Result<Option<Taxon>> {
        let by_slug = format!("SELECT id, name, slug FROM {} WHERE slug = ?", table(kind));
        let row = sqlx::query(&by_slug)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        if let Some(row) = row {
            return taxon_from_row(&row).map(Some);
        }

        let Ok(id) = key.parse::<TaxonId>() else {
            return Ok(None);
        };
        let by_id = format!("SELECT id, name, slug FROM {} WHERE id = ?", table(kind));
        let row = sqlx::query(&by_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(taxon_from_row).transpose()
    }

    async fn list_taxa(&self, kind: TaxonomyKind, filter: &TaxonFilter, page: PageParams) -> Result<Page<Taxon>> {
        let mut count = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", table(kind)));
        push_taxon_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT id, name, slug FROM {}", table(kind)));
        push_taxon_filter(&mut select, filter);
        select.push(match NameOrdering::parse(filter.ordering.as_deref()) {
            NameOrdering::Ascending => " ORDER BY name ASC, id ASC",
            NameOrdering::Descending => " ORDER BY name DESC, id DESC",
        });
        select
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let rows = select.build().fetch_all(&self.pool).await.map_err(db_err)?;

        Ok(Page {
            count: total,
            results: rows.iter().map(taxon_from_row).collect::<Result<_>>()?,
            params: page,
        })
    }

    async fn update_taxon(&self, kind: TaxonomyKind, id: TaxonId, draft: &TaxonDraft) -> Result<Taxon> {
        let sql = format!("UPDATE {} SET name = ?, slug = ? WHERE id = ?", table(kind));
        let affected = sqlx::query(&sql)
            .bind(&draft.name)
            .bind(&draft.slug)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::not_found(kind.entity_name(), id));
        }
        Ok(Taxon { id, name: draft.name.clone(), slug: draft.slug.clone() })
    }

    async fn delete_taxon(&self, kind: TaxonomyKind, id: TaxonId) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", table(kind));
        let affected = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();
        if affected > 0 {
            info!(kind = kind.entity_name(), id, "taxon deleted");
        }
        Ok(affected > 0)
    }

    async fn create_title(&self, draft: &TitleDraft) -> Result<TitleId> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let refs = resolve_refs(&mut *tx, draft).await?;

        let id = sqlx::query("INSERT INTO titles (name, year, description, category_id) VALUES (?, ?, ?, ?)")
            .bind(&draft.name)
            .bind(draft.year)
            .bind(&draft.description)
            .bind(refs.category_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .last_insert_rowid();
        link_genres(&mut *tx, id, &refs.genre_ids).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(id)
    }

    async fn get_title(&self, id: TitleId) -> Result<Option<Title>> {
        let sql = format!("{} WHERE t.id = ?", TITLE_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut titles = [title_from_row(&row)?];
        self.attach_genres(&mut titles).await?;
        let [title] = titles;
        Ok(Some(title))
    }

    async fn list_titles(&self, filter: &TitleFilter, page: PageParams) -> Result<Page<Title>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM titles t");
        push_title_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(TITLE_SELECT);
        push_title_filter(&mut select, filter);
        select
            .push(" ORDER BY t.year ASC, t.id ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let rows = select.build().fetch_all(&self.pool).await.map_err(db_err)?;

        let mut titles = rows.iter().map(title_from_row).collect::<Result<Vec<_>>>()?;
        self.attach_genres(&mut titles).await?;
        Ok(Page { count: total, results: titles, params: page })
    }

    async fn update_title(&self, id: TitleId, draft: &TitleDraft) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let refs = resolve_refs(&mut *tx, draft).await?;

        let affected = sqlx::query("UPDATE titles SET name = ?, year = ?, description = ?, category_id = ? WHERE id = ?")
            .bind(&draft.name)
            .bind(draft.year)
            .bind(&draft.description)
            .bind(refs.category_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::not_found("title", id));
        }

        sqlx::query("DELETE FROM title_genres WHERE title_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        link_genres(&mut *tx, id, &refs.genre_ids).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_title(&self, id: TitleId) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM titles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();
        if affected > 0 {
            info!(title_id = id, "title deleted");
        }
        Ok(affected > 0)
    }
}
