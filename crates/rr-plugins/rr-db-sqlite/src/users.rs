use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rr_core::error::{AppError, Result};
use rr_core::models::{NewUser, Role, User, UserId};
use rr_core::pagination::{Page, PageParams, UserFilter};
use rr_core::traits::UserRepo;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::{contains_pattern, db_err, decode_err, SqliteRepo};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, bio, role, is_superuser, date_joined, last_login";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.try_get("role").map_err(db_err)?;
    Ok(User {
        id: row.try_get("id").map_err(db_err)?,
        username: row.try_get("username").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        first_name: row.try_get("first_name").map_err(db_err)?,
        last_name: row.try_get("last_name").map_err(db_err)?,
        bio: row.try_get("bio").map_err(db_err)?,
        role: role.parse::<Role>().map_err(|_| decode_err("role", &role))?,
        is_superuser: row.try_get("is_superuser").map_err(db_err)?,
        date_joined: row.try_get("date_joined").map_err(db_err)?,
        last_login: row.try_get("last_login").map_err(db_err)?,
    })
}

fn push_user_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" WHERE username LIKE ")
            .push_bind(contains_pattern(search))
            .push(" ESCAPE '\\'");
    }
}

impl SqliteRepo {
    async fn fetch_user(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl UserRepo for SqliteRepo {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let id = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, bio, role, is_superuser, date_joined) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(user.role.as_str())
        .bind(user.is_superuser)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .last_insert_rowid();

        self.get_user(id).await?.ok_or_else(|| AppError::not_found("user", id))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_user("username", username).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_user("email", email).await
    }

    async fn list_users(&self, filter: &UserFilter, page: PageParams) -> Result<Page<User>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_user_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_user_filter(&mut select, filter);
        select
            .push(" ORDER BY id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let rows = select.build().fetch_all(&self.pool).await.map_err(db_err)?;

        Ok(Page {
            count: total,
            results: rows.iter().map(user_from_row).collect::<Result<_>>()?,
            params: page,
        })
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let affected = sqlx::query(
            "UPDATE users SET username = ?, email = ?, first_name = ?, last_name = ?, bio = ?, \
             role = ?, is_superuser = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(user.role.as_str())
        .bind(user.is_superuser)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .rows_affected();

        if affected == 0 {
            return Err(AppError::not_found("user", &user.username));
        }
        self.get_user(user.id)
            .await?
            .ok_or_else(|| AppError::not_found("user", &user.username))
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();
        Ok(affected > 0)
    }
}
