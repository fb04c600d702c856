use async_trait::async_trait;
use chrono::Utc;
use rr_core::drafts::ReviewDraft;
use rr_core::error::{AppError, Result};
use rr_core::models::{Comment, CommentId, NewComment, NewReview, Review, ReviewId, TitleId};
use rr_core::pagination::{Page, PageParams};
use rr_core::traits::ReviewRepo;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;

use crate::{db_err, decode_err, SqliteRepo};

const REVIEW_SELECT: &str = "SELECT r.id, r.title_id, r.author_id, u.username AS author, r.text, r.score, r.pub_date \
     FROM reviews r JOIN users u ON u.id = r.author_id";

const COMMENT_SELECT: &str = "SELECT c.id, c.review_id, c.author_id, u.username AS author, c.text, c.pub_date \
     FROM comments c JOIN users u ON u.id = c.author_id";

fn review_from_row(row: &SqliteRow) -> Result<Review> {
    let score: i64 = row.try_get("score").map_err(db_err)?;
    Ok(Review {
        id: row.try_get("id").map_err(db_err)?,
        title_id: row.try_get("title_id").map_err(db_err)?,
        author_id: row.try_get("author_id").map_err(db_err)?,
        text: row.try_get("text").map_err(db_err)?,
        author: row.try_get("author").map_err(db_err)?,
        score: u8::try_from(score).map_err(|e| decode_err("score", e))?,
        pub_date: row.try_get("pub_date").map_err(db_err)?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id").map_err(db_err)?,
        review_id: row.try_get("review_id").map_err(db_err)?,
        author_id: row.try_get("author_id").map_err(db_err)?,
        text: row.try_get("text").map_err(db_err)?,
        author: row.try_get("author").map_err(db_err)?,
        pub_date: row.try_get("pub_date").map_err(db_err)?,
    })
}

impl SqliteRepo {
    async fn review_by_id(&self, id: ReviewId) -> Result<Review> {
        let sql = format!("{} WHERE r.id = ?", REVIEW_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::not_found("review", id))?;
        review_from_row(&row)
    }

    async fn comment_by_id(&self, id: CommentId) -> Result<Comment> {
        let sql = format!("{} WHERE c.id = ?", COMMENT_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::not_found("comment", id))?;
        comment_from_row(&row)
    }
}

#[async_trait]
impl ReviewRepo for SqliteRepo {
    async fn create_review(&self, review: NewReview) -> Result<Review> {
        // Single INSERT: the unique index decides between concurrent duplicates.
        let id = sqlx::query("INSERT INTO reviews (title_id, author_id, text, score, pub_date) VALUES (?, ?, ?, ?, ?)")
            .bind(review.title_id)
            .bind(review.author_id)
            .bind(&review.text)
            .bind(i64::from(review.score))
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .last_insert_rowid();
        info!(review_id = id, title_id = review.title_id, author_id = review.author_id, "review created");
        self.review_by_id(id).await
    }

    async fn list_reviews(&self, title_id: TitleId, page: PageParams) -> Result<Page<Review>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = ?")
            .bind(title_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        let sql = format!("{} WHERE r.title_id = ? ORDER BY r.id ASC LIMIT ? OFFSET ?", REVIEW_SELECT);
        let rows = sqlx::query(&sql)
            .bind(title_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(Page {
            count: total,
            results: rows.iter().map(review_from_row).collect::<Result<_>>()?,
            params: page,
        })
    }

    async fn get_review(&self, title_id: TitleId, review_id: ReviewId) -> Result<Option<Review>> {
        let sql = format!("{} WHERE r.id = ? AND r.title_id = ?", REVIEW_SELECT);
        let row = sqlx::query(&sql)
            .bind(review_id)
            .bind(title_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn update_review(&self, id: ReviewId, draft: &ReviewDraft) -> Result<Review> {
        let affected = sqlx::query("UPDATE reviews SET text = ?, score = ? WHERE id = ?")
            .bind(&draft.text)
            .bind(i64::from(draft.score))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::not_found("review", id));
        }
        self.review_by_id(id).await
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let id = sqlx::query("INSERT INTO comments (review_id, author_id, text, pub_date) VALUES (?, ?, ?, ?)")
            .bind(comment.review_id)
            .bind(comment.author_id)
            .bind(&comment.text)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .last_insert_rowid();
        self.comment_by_id(id).await
    }

    async fn list_comments(&self, review_id: ReviewId, page: PageParams) -> Result<Page<Comment>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = ?")
            .bind(review_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        let sql = format!("{} WHERE c.review_id = ? ORDER BY c.id ASC LIMIT ? OFFSET ?", COMMENT_SELECT);
        let rows = sqlx::query(&sql)
            .bind(review_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(Page {
            count: total,
            results: rows.iter().map(comment_from_row).collect::<Result<_>>()?,
            params: page,
        })
    }

    async fn get_comment(&self, review_id: ReviewId, comment_id: CommentId) -> Result<Option<Comment>> {
        let sql = format!("{} WHERE c.id = ? AND c.review_id = ?", COMMENT_SELECT);
        let row = sqlx::query(&sql)
            .bind(comment_id)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(comment_from_row).transpose()
    }

    async fn update_comment(&self, id: CommentId, text: &str) -> Result<Comment> {
        let affected = sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
            .bind(text)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::not_found("comment", id));
        }
        self.comment_by_id(id).await
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();
        Ok(affected > 0)
    }
}
