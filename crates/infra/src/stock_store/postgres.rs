//! Postgres-backed stock store.
//!
//! One row per ingredient in `ingredient_stock`. Every batch runs in a single
//! transaction, and every write is guarded by its expected version:
//!
//! | expected | statement | 0 rows affected |
//! |---|---|---|
//! | `NoRow` | `INSERT ... ON CONFLICT (id) DO NOTHING` | `Concurrency` |
//! | `Exact(v)` | `UPDATE ... WHERE id = $1 AND version = v` | `NotFound` or `Concurrency` |
//! | `Any` | `INSERT ... ON CONFLICT (id) DO UPDATE` | n/a |
//!
//! Returning early drops the transaction, which rolls it back.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |---|---|---|
//! | Database (unique violation) | `23505` | `Concurrency` |
//! | Database (check violation) | `23514` | `Backend` |
//! | anything else | | `Backend` |

use std::sync::Arc;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use larder_core::{AggregateId, ExpectedVersion};
use larder_inventory::{IngredientCategory, IngredientId, IngredientSnapshot, compute_status};

use super::r#trait::{StockStore, StockWrite, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_create_ingredient_stock.sql");

const COLUMNS: &str = "id, name, category, quantity, unit, reorder_threshold, supplier, \
                       cost_per_unit, status, last_restocked_at, version";

#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: Arc<PgPool>,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the schema if it isn't there yet. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn write_one(
        tx: &mut Transaction<'_, Postgres>,
        write: &StockWrite,
    ) -> Result<(), StoreError> {
        let s = &write.snapshot;
        let version = to_db_version(s.version)?;

        match write.expected {
            ExpectedVersion::NoRow => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO ingredient_stock (
                        id, name, category, quantity, unit, reorder_threshold,
                        supplier, cost_per_unit, status, last_restocked_at, version
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(s.id.0.as_uuid())
                .bind(&s.name)
                .bind(s.category.as_str())
                .bind(s.quantity)
                .bind(&s.unit)
                .bind(s.reorder_threshold)
                .bind(s.supplier.as_deref())
                .bind(s.cost_per_unit)
                .bind(s.status.as_str())
                .bind(s.last_restocked_at)
                .bind(version)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("insert", e))?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::Concurrency(format!(
                        "ingredient {} already exists",
                        s.id
                    )));
                }
            }
            ExpectedVersion::Exact(expected) => {
                let result = sqlx::query(
                    r#"
                    UPDATE ingredient_stock
                    SET name = $2, category = $3, quantity = $4, unit = $5,
                        reorder_threshold = $6, supplier = $7, cost_per_unit = $8,
                        status = $9, last_restocked_at = $10, version = $11,
                        updated_at = now()
                    WHERE id = $1 AND version = $12
                    "#,
                )
                .bind(s.id.0.as_uuid())
                .bind(&s.name)
                .bind(s.category.as_str())
                .bind(s.quantity)
                .bind(&s.unit)
                .bind(s.reorder_threshold)
                .bind(s.supplier.as_deref())
                .bind(s.cost_per_unit)
                .bind(s.status.as_str())
                .bind(s.last_restocked_at)
                .bind(version)
                .bind(to_db_version(expected)?)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("update", e))?;

                if result.rows_affected() == 0 {
                    let current: Option<i64> =
                        sqlx::query_scalar("SELECT version FROM ingredient_stock WHERE id = $1")
                            .bind(s.id.0.as_uuid())
                            .fetch_optional(&mut **tx)
                            .await
                            .map_err(|e| map_sqlx_error("check_version", e))?;
                    return Err(match current {
                        None => StoreError::NotFound(s.id),
                        Some(found) => StoreError::Concurrency(format!(
                            "ingredient {}: expected version {expected}, found {found}",
                            s.id
                        )),
                    });
                }
            }
            ExpectedVersion::Any => {
                sqlx::query(
                    r#"
                    INSERT INTO ingredient_stock (
                        id, name, category, quantity, unit, reorder_threshold,
                        supplier, cost_per_unit, status, last_restocked_at, version
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    ON CONFLICT (id) DO UPDATE SET
                        name = EXCLUDED.name,
                        category = EXCLUDED.category,
                        quantity = EXCLUDED.quantity,
                        unit = EXCLUDED.unit,
                        reorder_threshold = EXCLUDED.reorder_threshold,
                        supplier = EXCLUDED.supplier,
                        cost_per_unit = EXCLUDED.cost_per_unit,
                        status = EXCLUDED.status,
                        last_restocked_at = EXCLUDED.last_restocked_at,
                        version = EXCLUDED.version,
                        updated_at = now()
                    "#,
                )
                .bind(s.id.0.as_uuid())
                .bind(&s.name)
                .bind(s.category.as_str())
                .bind(s.quantity)
                .bind(&s.unit)
                .bind(s.reorder_threshold)
                .bind(s.supplier.as_deref())
                .bind(s.cost_per_unit)
                .bind(s.status.as_str())
                .bind(s.last_restocked_at)
                .bind(version)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("upsert", e))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StockStore for PostgresStockStore {
    #[instrument(skip(self), err)]
    async fn load_all(&self) -> Result<Vec<IngredientSnapshot>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM ingredient_stock ORDER BY id");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_all", e))?;
        rows.iter().map(snapshot_from_row).collect()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn load(&self, ids: &[IngredientId]) -> Result<Vec<IngredientSnapshot>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| *id.0.as_uuid()).collect();
        let sql = format!("SELECT {COLUMNS} FROM ingredient_stock WHERE id = ANY($1) ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(&uuids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load", e))?;
        rows.iter().map(snapshot_from_row).collect()
    }

    #[instrument(skip(self, writes), fields(count = writes.len()), err)]
    async fn commit(&self, writes: Vec<StockWrite>) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for write in &writes {
            Self::write_one(&mut tx, write).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(ingredient_id = %id), err)]
    async fn remove(&self, id: IngredientId, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT version FROM ingredient_stock WHERE id = $1 FOR UPDATE")
                .bind(id.0.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("remove", e))?;

        let Some(current) = current else {
            return Err(StoreError::NotFound(id));
        };
        let current = from_db_version(current)?;
        if !expected.matches(Some(current)) {
            return Err(StoreError::Concurrency(format!(
                "ingredient {id}: expected {expected:?}, found {current}"
            )));
        }

        sqlx::query("DELETE FROM ingredient_stock WHERE id = $1")
            .bind(id.0.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }
}

/// Decode one row. The stored `status` column is read back but discarded in
/// favour of a fresh computation.
fn snapshot_from_row(row: &PgRow) -> Result<IngredientSnapshot, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Backend(format!("failed to decode stock row: {e}"));

    let id: uuid::Uuid = row.try_get("id").map_err(decode)?;
    let category: String = row.try_get("category").map_err(decode)?;
    let quantity: Decimal = row.try_get("quantity").map_err(decode)?;
    let reorder_threshold: Decimal = row.try_get("reorder_threshold").map_err(decode)?;
    let version: i64 = row.try_get("version").map_err(decode)?;

    Ok(IngredientSnapshot {
        id: IngredientId::new(AggregateId::from_uuid(id)),
        name: row.try_get("name").map_err(decode)?,
        category: IngredientCategory::from_str(&category)
            .map_err(|e| StoreError::Backend(format!("bad category in row {id}: {e}")))?,
        quantity,
        unit: row.try_get("unit").map_err(decode)?,
        reorder_threshold,
        supplier: row.try_get("supplier").map_err(decode)?,
        cost_per_unit: row.try_get("cost_per_unit").map_err(decode)?,
        status: compute_status(quantity, reorder_threshold),
        last_restocked_at: row.try_get("last_restocked_at").map_err(decode)?,
        version: from_db_version(version)?,
    })
}

fn to_db_version(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Backend(format!("version {version} out of range")))
}

fn from_db_version(version: i64) -> Result<u64, StoreError> {
    u64::try_from(version).map_err(|_| StoreError::Backend(format!("negative version {version} in store")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Concurrency(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
