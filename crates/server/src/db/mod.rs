pub mod models;

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use models::FileNode;

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        // Ensure the data directory exists
        if let Some(path) = url.strip_prefix("sqlite:") {
            let path = path.split('?').next().unwrap_or(path);
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // An in-memory database exists per connection, so it must not be
        // spread across a pool.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        // References in the schema are declarative; handlers take referenced
        // rows on trust and never rely on cascades.
        let options = SqliteConnectOptions::from_str(url)?.foreign_keys(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Point lookup shared by the file handlers and the parent checks of the
    /// authorization policy.
    pub async fn file_by_id(&self, id: &str) -> sqlx::Result<Option<FileNode>> {
        sqlx::query_as::<_, FileNode>("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}
