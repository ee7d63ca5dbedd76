use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Conditions applied to a recipe listing. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<String>,
    /// Every term must be contained (case-insensitively) in at least one tag.
    pub tag_terms: Vec<String>,
    /// Contiguous, case-insensitive title substring.
    pub title_phrase: Option<String>,
    pub favorited_by: Option<String>,
    pub ids: Option<Vec<String>>,
}

impl RecipeFilter {
    fn where_clause(&self) -> StoreResult<(String, Vec<String>)> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(author) = &self.author {
            conditions.push("author = ?".to_string());
            values.push(author.clone());
        }
        for term in &self.tag_terms {
            conditions.push(
                r"EXISTS (SELECT 1 FROM json_each(recipes.tags) WHERE unicode_lower(json_each.value) LIKE ? ESCAPE '\')"
                    .to_string(),
            );
            values.push(like_pattern(&term.to_lowercase()));
        }
        if let Some(phrase) = &self.title_phrase {
            conditions.push(r"unicode_lower(title) LIKE ? ESCAPE '\'".to_string());
            values.push(like_pattern(&phrase.to_lowercase()));
        }
        if let Some(user_id) = &self.favorited_by {
            conditions.push(
                "EXISTS (SELECT 1 FROM json_each(recipes.favorites) WHERE json_each.value = ?)"
                    .to_string(),
            );
            values.push(user_id.clone());
        }
        if let Some(ids) = &self.ids {
            conditions.push("id IN (SELECT value FROM json_each(?))".to_string());
            values.push(serde_json::to_string(ids)?);
        }

        if conditions.is_empty() {
            Ok((String::new(), values))
        } else {
            Ok((format!(" WHERE {}", conditions.join(" AND ")), values))
        }
    }
}

/// Thread-safe SQLite store
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path
    pub fn new(db_path: &str) -> StoreResult<Self> {
        Self::open(Connection::open(db_path)?)
    }

    /// Create an in-memory store for testing
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(Connection::open_in_memory()?)
    }

    fn open(conn: Connection) -> StoreResult<Self> {
        register_functions(&conn)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                name TEXT DEFAULT '',
                avatar TEXT DEFAULT '',
                bio TEXT DEFAULT '',
                saved_recipes TEXT DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS recipes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                tags TEXT DEFAULT '[]',
                ingredients TEXT DEFAULT '[]',
                image_url TEXT,
                sections TEXT DEFAULT '[]',
                author TEXT NOT NULL,
                likes TEXT DEFAULT '[]',
                favorites TEXT DEFAULT '[]',
                views INTEGER DEFAULT 0,
                comments_count INTEGER DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (author) REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                recipe_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                replies TEXT DEFAULT '[]',
                likes TEXT DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (recipe_id) REFERENCES recipes(id),
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_recipes_author ON recipes(author);
            CREATE INDEX IF NOT EXISTS idx_recipes_created ON recipes(created_at);
            CREATE INDEX IF NOT EXISTS idx_comments_recipe ON comments(recipe_id);
            "#,
        )?;
        Ok(())
    }

    // ==================== User Operations ====================

    pub fn create_user(&self, user: &mut User) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        user.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        user.created_at = now;
        user.updated_at = now;

        let saved_json = serde_json::to_string(&user.saved_recipes)?;

        conn.execute(
            r#"INSERT INTO users (id, username, email, password_hash, name, avatar, bio,
                saved_recipes, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                &user.id,
                &user.username,
                &user.email,
                &user.password_hash,
                &user.name,
                &user.avatar,
                &user.bio,
                &saved_json,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict("User already exists".to_string())
            }
            _ => StoreError::Database(e),
        })?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> StoreResult<User> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM users WHERE id = ?1",
            params![id],
            |row| self.row_to_user(row),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("User".to_string()),
            _ => StoreError::Database(e),
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM users WHERE email = ?1",
            params![email],
            |row| self.row_to_user(row),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("User".to_string()),
            _ => StoreError::Database(e),
        })
    }

    /// Persist profile fields and the password hash.
    pub fn update_user(&self, user: &mut User) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        user.updated_at = Utc::now();

        let rows = conn.execute(
            r#"UPDATE users SET name = ?1, avatar = ?2, bio = ?3, password_hash = ?4,
               updated_at = ?5 WHERE id = ?6"#,
            params![
                &user.name,
                &user.avatar,
                &user.bio,
                &user.password_hash,
                format_datetime(&user.updated_at),
                &user.id,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound("User".to_string()));
        }
        Ok(())
    }

    pub fn set_saved_recipes(&self, user_id: &str, saved: &[String]) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let saved_json = serde_json::to_string(saved)?;
        let rows = conn.execute(
            "UPDATE users SET saved_recipes = ?1 WHERE id = ?2",
            params![&saved_json, user_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("User".to_string()));
        }
        Ok(())
    }

    /// Public profile summaries keyed by user id. Unknown ids are skipped.
    pub fn get_user_summaries(&self, ids: &[String]) -> StoreResult<HashMap<String, UserSummary>> {
        let conn = self.conn.lock().unwrap();
        let ids_json = serde_json::to_string(ids)?;
        let mut stmt = conn.prepare(
            "SELECT id, username, name, avatar FROM users WHERE id IN (SELECT value FROM json_each(?1))",
        )?;
        let rows = stmt.query_map(params![&ids_json], |row| {
            Ok(UserSummary {
                id: row.get("id")?,
                username: row.get("username")?,
                name: row.get("name")?,
                avatar: row.get("avatar")?,
            })
        })?;

        let mut summaries = HashMap::new();
        for row in rows {
            let summary = row?;
            summaries.insert(summary.id.clone(), summary);
        }
        Ok(summaries)
    }

    fn row_to_user(&self, row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get("id")?,
            username: row.get("username")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            name: row.get("name")?,
            avatar: row.get("avatar")?,
            bio: row.get("bio")?,
            saved_recipes: json_column(row.get::<_, String>("saved_recipes")?),
            created_at: parse_datetime(row.get::<_, String>("created_at")?),
            updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
        })
    }

    // ==================== Recipe Operations ====================

    pub fn create_recipe(&self, recipe: &mut Recipe) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        recipe.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        recipe.created_at = now;
        recipe.updated_at = now;

        conn.execute(
            r#"INSERT INTO recipes (id, title, description, tags, ingredients, image_url, sections,
                author, likes, favorites, views, comments_count, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
            params![
                &recipe.id,
                &recipe.title,
                &recipe.description,
                serde_json::to_string(&recipe.tags)?,
                serde_json::to_string(&recipe.ingredients)?,
                &recipe.image_url,
                serde_json::to_string(&recipe.sections)?,
                &recipe.author,
                serde_json::to_string(&recipe.likes)?,
                serde_json::to_string(&recipe.favorites)?,
                recipe.views,
                recipe.comments_count,
                format_datetime(&recipe.created_at),
                format_datetime(&recipe.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_recipe(&self, id: &str) -> StoreResult<Recipe> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM recipes WHERE id = ?1", params![id], |row| {
            self.row_to_recipe(row)
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("Recipe".to_string()),
            _ => StoreError::Database(e),
        })
    }

    /// Persist the author-editable fields. Counters and membership sets are
    /// written through their own field-level operations.
    pub fn update_recipe(&self, recipe: &mut Recipe) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        recipe.updated_at = Utc::now();

        let rows = conn.execute(
            r#"UPDATE recipes SET title = ?1, description = ?2, tags = ?3, ingredients = ?4,
               image_url = ?5, sections = ?6, updated_at = ?7 WHERE id = ?8"#,
            params![
                &recipe.title,
                &recipe.description,
                serde_json::to_string(&recipe.tags)?,
                serde_json::to_string(&recipe.ingredients)?,
                &recipe.image_url,
                serde_json::to_string(&recipe.sections)?,
                format_datetime(&recipe.updated_at),
                &recipe.id,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound("Recipe".to_string()));
        }
        Ok(())
    }

    /// Remove a recipe, every comment attached to it and every saved
    /// reference to it.
    pub fn delete_recipe(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound("Recipe".to_string()));
        }
        conn.execute("DELETE FROM comments WHERE recipe_id = ?1", params![id])?;
        conn.execute(
            r#"UPDATE users SET saved_recipes = (
                   SELECT json_group_array(value) FROM json_each(users.saved_recipes) WHERE value != ?1
               )
               WHERE EXISTS (SELECT 1 FROM json_each(users.saved_recipes) WHERE value = ?1)"#,
            params![id],
        )?;
        Ok(())
    }

    /// Newest first; equal timestamps keep insertion order.
    pub fn list_recipes(
        &self,
        filter: &RecipeFilter,
        skip: i64,
        limit: Option<i64>,
    ) -> StoreResult<Vec<Recipe>> {
        let (where_sql, values) = filter.where_clause()?;
        let mut sql = format!(
            "SELECT * FROM recipes{} ORDER BY created_at DESC, rowid ASC",
            where_sql
        );
        match limit {
            Some(limit) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, skip)),
            None if skip > 0 => sql.push_str(&format!(" LIMIT -1 OFFSET {}", skip)),
            None => {}
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| self.row_to_recipe(row))?;

        let mut recipes = Vec::new();
        for row in rows {
            recipes.push(row?);
        }
        Ok(recipes)
    }

    pub fn count_recipes(&self, filter: &RecipeFilter) -> StoreResult<i64> {
        let (where_sql, values) = filter.where_clause()?;
        let sql = format!("SELECT COUNT(*) FROM recipes{}", where_sql);

        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count)
    }

    pub fn increment_views(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE recipes SET views = views + 1 WHERE id = ?1",
            params![id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("Recipe".to_string()));
        }
        Ok(())
    }

    pub fn set_comments_count(&self, id: &str, count: i64) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE recipes SET comments_count = ?1 WHERE id = ?2",
            params![count, id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("Recipe".to_string()));
        }
        Ok(())
    }

    pub fn set_recipe_likes(&self, id: &str, likes: &[String]) -> StoreResult<()> {
        self.set_recipe_members(id, "likes", likes)
    }

    pub fn set_recipe_favorites(&self, id: &str, favorites: &[String]) -> StoreResult<()> {
        self.set_recipe_members(id, "favorites", favorites)
    }

    fn set_recipe_members(&self, id: &str, column: &str, members: &[String]) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let members_json = serde_json::to_string(members)?;
        let rows = conn.execute(
            &format!("UPDATE recipes SET {} = ?1 WHERE id = ?2", column),
            params![&members_json, id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("Recipe".to_string()));
        }
        Ok(())
    }

    fn row_to_recipe(&self, row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        Ok(Recipe {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            tags: json_column(row.get::<_, String>("tags")?),
            ingredients: json_column(row.get::<_, String>("ingredients")?),
            image_url: row.get("image_url")?,
            sections: json_column(row.get::<_, String>("sections")?),
            author: row.get("author")?,
            likes: json_column(row.get::<_, String>("likes")?),
            favorites: json_column(row.get::<_, String>("favorites")?),
            views: row.get("views")?,
            comments_count: row.get("comments_count")?,
            created_at: parse_datetime(row.get::<_, String>("created_at")?),
            updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
        })
    }

    // ==================== Comment Operations ====================

    pub fn create_comment(&self, comment: &mut Comment) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        comment.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        comment.created_at = now;
        comment.updated_at = now;

        conn.execute(
            r#"INSERT INTO comments (id, content, recipe_id, user_id, replies, likes, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                &comment.id,
                &comment.content,
                &comment.recipe,
                &comment.user,
                serde_json::to_string(&comment.replies)?,
                serde_json::to_string(&comment.likes)?,
                format_datetime(&comment.created_at),
                format_datetime(&comment.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_comment(&self, id: &str) -> StoreResult<Comment> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM comments WHERE id = ?1", params![id], |row| {
            self.row_to_comment(row)
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("Comment".to_string()),
            _ => StoreError::Database(e),
        })
    }

    pub fn update_comment_content(&self, comment: &mut Comment) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        comment.updated_at = Utc::now();

        let rows = conn.execute(
            "UPDATE comments SET content = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                &comment.content,
                format_datetime(&comment.updated_at),
                &comment.id
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("Comment".to_string()));
        }
        Ok(())
    }

    pub fn set_comment_replies(&self, id: &str, replies: &[Reply]) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let replies_json = serde_json::to_string(replies)?;
        let rows = conn.execute(
            "UPDATE comments SET replies = ?1, updated_at = ?2 WHERE id = ?3",
            params![&replies_json, format_datetime(&Utc::now()), id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("Comment".to_string()));
        }
        Ok(())
    }

    pub fn set_comment_likes(&self, id: &str, likes: &[String]) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let likes_json = serde_json::to_string(likes)?;
        let rows = conn.execute(
            "UPDATE comments SET likes = ?1 WHERE id = ?2",
            params![&likes_json, id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("Comment".to_string()));
        }
        Ok(())
    }

    pub fn delete_comment(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound("Comment".to_string()));
        }
        Ok(())
    }

    /// Comments on a recipe, newest first.
    pub fn list_comments_by_recipe(&self, recipe_id: &str) -> StoreResult<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM comments WHERE recipe_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![recipe_id], |row| self.row_to_comment(row))?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    pub fn count_comments_by_recipe(&self, recipe_id: &str) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE recipe_id = ?1",
            params![recipe_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn row_to_comment(&self, row: &rusqlite::Row) -> rusqlite::Result<Comment> {
        Ok(Comment {
            id: row.get("id")?,
            content: row.get("content")?,
            recipe: row.get("recipe_id")?,
            user: row.get("user_id")?,
            replies: json_column(row.get::<_, String>("replies")?),
            likes: json_column(row.get::<_, String>("likes")?),
            created_at: parse_datetime(row.get::<_, String>("created_at")?),
            updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
            user_profile: None,
        })
    }
}

/// SQLite's `lower()` and `LIKE` only fold ASCII. `unicode_lower` folds
/// with Rust's full Unicode mapping so that "BÁNH" matches "bánh".
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
    )
}

/// `%term%` with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn json_column<T: serde::de::DeserializeOwned + Default>(s: String) -> T {
    serde_json::from_str(&s).unwrap_or_else(|e| {
        log::warn!("Unreadable JSON column {:?}: {}", s, e);
        T::default()
    })
}

// Fixed width so that lexical order is chronological order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Unparsable timestamps read as the epoch, so a corrupt row sorts last
/// rather than jumping to the top of a newest-first listing.
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("Unreadable timestamp {:?}: {}", s, e);
            DateTime::<Utc>::UNIX_EPOCH
        })
}
