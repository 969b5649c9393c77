use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{FoodSpot, RestaurantDirectory};

/// Source of restaurant directory snapshots.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    async fn load_directory(&self) -> Result<RestaurantDirectory>;

    /// Monotonic counter that changes whenever the directory does.
    async fn revision(&self) -> Result<i64>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Food,
    Cuisine,
}

impl TagKind {
    fn as_str(self) -> &'static str {
        match self {
            TagKind::Food => "food",
            TagKind::Cuisine => "cuisine",
        }
    }
}

/// One record of the real-time database export, keyed by food spot id.
#[derive(Debug, Deserialize)]
struct ExportedFoodSpot {
    #[serde(default)]
    food: Vec<String>,
    #[serde(default)]
    cuisine: Vec<String>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts or replaces a food spot together with its food and cuisine
    /// tags.
    pub async fn upsert_food_spot(&self, spot: &FoodSpot) -> Result<()> {
        let id = spot.id.trim();
        if id.is_empty() {
            bail!("food spot id cannot be empty");
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO food_spots (id, updated_at) VALUES (?, CURRENT_TIMESTAMP)
             ON CONFLICT(id) DO UPDATE SET updated_at = CURRENT_TIMESTAMP",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM food_spot_tags WHERE food_spot_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for (kind, values) in [(TagKind::Food, &spot.food), (TagKind::Cuisine, &spot.cuisine)] {
            for (position, value) in values.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO food_spot_tags (food_spot_id, kind, position, value) VALUES (?, ?, ?, ?)",
                )
                .bind(id)
                .bind(kind.as_str())
                .bind(position as i64)
                .bind(value.as_str())
                .execute(&mut *tx)
                .await?;
            }
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn remove_food_spot(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM food_spot_tags WHERE food_spot_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM food_spots WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed > 0 {
            bump_revision(&mut tx).await?;
        }
        tx.commit().await?;
        Ok(removed > 0)
    }

    pub async fn list_food_spots(&self) -> Result<Vec<FoodSpot>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM food_spots ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let mut spots: Vec<FoodSpot> = ids
            .into_iter()
            .map(|id| FoodSpot {
                id,
                food: Vec::new(),
                cuisine: Vec::new(),
            })
            .collect();
        let index: HashMap<String, usize> = spots
            .iter()
            .enumerate()
            .map(|(i, spot)| (spot.id.clone(), i))
            .collect();

        let rows = sqlx::query(
            "SELECT food_spot_id, kind, value FROM food_spot_tags
             ORDER BY food_spot_id, kind, position",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            let food_spot_id: String = row.try_get("food_spot_id")?;
            let kind: String = row.try_get("kind")?;
            let value: String = row.try_get("value")?;
            let Some(&i) = index.get(&food_spot_id) else {
                continue;
            };
            match kind.as_str() {
                "food" => spots[i].food.push(value),
                "cuisine" => spots[i].cuisine.push(value),
                other => bail!("unknown tag kind '{other}' for food spot '{food_spot_id}'"),
            }
        }

        Ok(spots)
    }

    pub async fn directory_revision(&self) -> Result<i64> {
        let revision: i64 =
            sqlx::query_scalar("SELECT revision FROM directory_revision WHERE id = 1")
                .fetch_one(&self.pool)
                .await
                .context("failed to read directory revision")?;
        Ok(revision)
    }

    /// Loads a `{ "<id>": { "food": [...], "cuisine": [...] } }` export and
    /// upserts every record. Returns the number of records imported.
    pub async fn import_export(&self, raw: &str) -> Result<usize> {
        let spots = parse_food_spots_export(raw)?;
        for spot in &spots {
            self.upsert_food_spot(spot)
                .await
                .with_context(|| format!("failed to import food spot '{}'", spot.id))?;
        }
        Ok(spots.len())
    }
}

pub fn parse_food_spots_export(raw: &str) -> Result<Vec<FoodSpot>> {
    let records: BTreeMap<String, ExportedFoodSpot> =
        serde_json::from_str(raw).context("food spot export is not valid JSON")?;
    Ok(records
        .into_iter()
        .map(|(id, record)| FoodSpot {
            id,
            food: record.food,
            cuisine: record.cuisine,
        })
        .collect())
}

async fn bump_revision(tx: &mut sqlx::Transaction<'_, Sqlite>) -> Result<()> {
    sqlx::query("UPDATE directory_revision SET revision = revision + 1 WHERE id = 1")
        .execute(&mut **tx)
        .await
        .context("failed to bump directory revision")?;
    Ok(())
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl DirectoryProvider for Storage {
    async fn load_directory(&self) -> Result<RestaurantDirectory> {
        let spots = self
            .list_food_spots()
            .await
            .context("failed to load food spots")?;
        Ok(RestaurantDirectory::new(spots))
    }

    async fn revision(&self) -> Result<i64> {
        self.directory_revision().await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
