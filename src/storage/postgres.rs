//! PostgreSQL-backed store: one `items` table keyed by `(pk, sk)` with a JSONB
//! attribute column.
//!
//! Conditional writes lock the target row with `SELECT ... FOR UPDATE`,
//! evaluate the condition, then write inside the same database transaction.
//! Multi-item transactions lock rows in key order with `NOWAIT`, so a row
//! held by another in-flight transaction cancels instead of waiting.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};

use super::transaction::validate;
use super::{
    Attributes, CancellationReason, Condition, Direction, Item, Key, Mutation, Query, SortKeyCondition, Store,
    StoreError, TransactItem, UpdateAction,
};

/// SQLSTATE codes that mean another transaction got to the rows first:
/// lock_not_available, serialization_failure, deadlock_detected, unique_violation.
const CONFLICT_CODES: [&str; 4] = ["55P03", "40001", "40P01", "23505"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LockMode {
    Wait,
    NoWait,
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and runs the embedded migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self { Self { pool } }

    /// Runs the operations atomically. Single-item writes wait for row locks;
    /// transactions give up on the first busy row.
    async fn execute(&self, ops: &[TransactItem], mode: LockMode) -> Result<Option<Attributes>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut order: Vec<usize> = (0..ops.len()).collect();
        order.sort_by(|a, b| ops[*a].key().cmp(ops[*b].key()));

        let mut reasons = vec![CancellationReason::None; ops.len()];
        let mut current = vec![None; ops.len()];
        let mut cancelled = false;
        for idx in order {
            let op = &ops[idx];
            let row = match lock_row(&mut tx, op.key(), mode).await {
                Ok(row) => row,
                Err(err) if is_conflict(&err) => {
                    reasons[idx] = CancellationReason::TransactionConflict;
                    tx.rollback().await?;
                    return Err(StoreError::TransactionCancelled(reasons));
                }
                Err(err) => return Err(err.into()),
            };
            if op.condition().is_some_and(|c| !c.evaluate(row.as_ref())) {
                reasons[idx] = CancellationReason::ConditionFailed;
                cancelled = true;
            }
            current[idx] = Some(row);
        }
        if cancelled {
            tx.rollback().await?;
            return Err(StoreError::TransactionCancelled(reasons));
        }

        let mut last_written = None;
        for (idx, op) in ops.iter().enumerate() {
            let existing = current[idx].take().flatten();
            let existed = existing.is_some();
            let mutation = op.mutation(existing.as_ref())?;
            if let Err(err) = write_row(&mut tx, op.key(), &mutation, existed).await {
                if is_conflict(&err) {
                    reasons[idx] = CancellationReason::TransactionConflict;
                    tx.rollback().await?;
                    return Err(StoreError::TransactionCancelled(reasons));
                }
                return Err(err.into());
            }
            if let Mutation::Write(attrs) = mutation {
                last_written = Some(attrs);
            }
        }

        if let Err(err) = tx.commit().await {
            if is_conflict(&err) {
                return Err(StoreError::TransactionCancelled(vec![
                    CancellationReason::TransactionConflict;
                    ops.len()
                ]));
            }
            return Err(err.into());
        }
        Ok(last_written)
    }

    /// Single-item write: a failed condition becomes [`StoreError::ConditionFailed`].
    /// A conditional write that lost a race (two inserts of an absent key) was
    /// checked against state that no longer holds, so it fails the same way.
    async fn execute_single(&self, op: TransactItem) -> Result<Option<Attributes>, StoreError> {
        let conditional = op.condition().is_some();
        match self.execute(std::slice::from_ref(&op), LockMode::Wait).await {
            Err(StoreError::TransactionCancelled(reasons))
                if reasons.contains(&CancellationReason::ConditionFailed)
                    || (conditional && reasons.contains(&CancellationReason::TransactionConflict)) =>
            {
                Err(StoreError::ConditionFailed)
            }
            other => other,
        }
    }
}

async fn lock_row(
    tx: &mut Transaction<'_, Postgres>,
    key: &Key,
    mode: LockMode,
) -> Result<Option<Attributes>, sqlx::Error> {
    let sql = match mode {
        LockMode::Wait => "SELECT attrs FROM items WHERE pk = $1 AND sk = $2 FOR UPDATE",
        LockMode::NoWait => "SELECT attrs FROM items WHERE pk = $1 AND sk = $2 FOR UPDATE NOWAIT",
    };
    let row: Option<(Json<Attributes>,)> =
        sqlx::query_as(sql).bind(&key.pk).bind(&key.sk).fetch_optional(&mut **tx).await?;
    Ok(row.map(|(Json(attrs),)| attrs))
}

async fn write_row(
    tx: &mut Transaction<'_, Postgres>,
    key: &Key,
    mutation: &Mutation,
    existed: bool,
) -> Result<(), sqlx::Error> {
    match (mutation, existed) {
        (Mutation::Keep, _) | (Mutation::Remove, false) => return Ok(()),
        (Mutation::Write(attrs), true) => {
            sqlx::query("UPDATE items SET attrs = $3 WHERE pk = $1 AND sk = $2")
                .bind(&key.pk)
                .bind(&key.sk)
                .bind(Json(attrs))
                .execute(&mut **tx)
                .await?;
        }
        (Mutation::Write(attrs), false) => {
            sqlx::query("INSERT INTO items (pk, sk, attrs) VALUES ($1, $2, $3)")
                .bind(&key.pk)
                .bind(&key.sk)
                .bind(Json(attrs))
                .execute(&mut **tx)
                .await?;
        }
        (Mutation::Remove, true) => {
            sqlx::query("DELETE FROM items WHERE pk = $1 AND sk = $2")
                .bind(&key.pk)
                .bind(&key.sk)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

fn is_conflict_code(code: &str) -> bool {
    CONFLICT_CODES.contains(&code)
}

fn is_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| is_conflict_code(&code))
}

/// Binds: `$1` partition, `$2` sort-key prefix, `$3`/`$4` inclusive range, `$5` limit.
/// Unused filters are bound as NULL.
fn query_sql(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => {
            "SELECT pk, sk, attrs FROM items WHERE pk = $1 \
             AND ($2::text IS NULL OR left(sk, length($2)) = $2) \
             AND ($3::text IS NULL OR sk >= $3) AND ($4::text IS NULL OR sk <= $4) \
             ORDER BY sk ASC LIMIT $5"
        }
        Direction::Backward => {
            "SELECT pk, sk, attrs FROM items WHERE pk = $1 \
             AND ($2::text IS NULL OR left(sk, length($2)) = $2) \
             AND ($3::text IS NULL OR sk >= $3) AND ($4::text IS NULL OR sk <= $4) \
             ORDER BY sk DESC LIMIT $5"
        }
    }
}

/// Splits the sort-key condition into the `(prefix, start, end)` bind values.
fn sort_key_binds(condition: Option<&SortKeyCondition>) -> (Option<&str>, Option<&str>, Option<&str>) {
    match condition {
        None => (None, None, None),
        Some(SortKeyCondition::BeginsWith(prefix)) => (Some(prefix.as_str()), None, None),
        Some(SortKeyCondition::Between(start, end)) => (None, Some(start.as_str()), Some(end.as_str())),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_item(&self, key: &Key) -> Result<Option<Item>, StoreError> {
        let row: Option<(Json<Attributes>,)> = sqlx::query_as("SELECT attrs FROM items WHERE pk = $1 AND sk = $2")
            .bind(&key.pk)
            .bind(&key.sk)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(attrs),)| Item { key: key.clone(), attrs }))
    }

    async fn query(&self, query: Query) -> Result<Vec<Item>, StoreError> {
        let (prefix, start, end) = sort_key_binds(query.sort_key.as_ref());
        let limit = query.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        let rows: Vec<(String, String, Json<Attributes>)> = sqlx::query_as(query_sql(query.direction))
            .bind(&query.partition)
            .bind(prefix)
            .bind(start)
            .bind(end)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(pk, sk, Json(attrs))| Item { key: Key { pk, sk }, attrs })
            .collect())
    }

    async fn put_item(&self, key: Key, attrs: Attributes, condition: Option<Condition>) -> Result<(), StoreError> {
        self.execute_single(TransactItem::Put { key, attrs, condition }).await?;
        Ok(())
    }

    async fn update_item(
        &self,
        key: Key,
        actions: Vec<UpdateAction>,
        condition: Option<Condition>,
    ) -> Result<Attributes, StoreError> {
        self.execute_single(TransactItem::Update { key, actions, condition })
            .await?
            .ok_or_else(|| StoreError::Malformed("update produced no item".into()))
    }

    async fn delete_item(&self, key: Key, condition: Option<Condition>) -> Result<(), StoreError> {
        self.execute_single(TransactItem::Delete { key, condition }).await?;
        Ok(())
    }

    async fn transact_write(&self, items: Vec<TransactItem>) -> Result<(), StoreError> {
        validate(&items)?;
        tracing::debug!(items = items.len(), "submitting transaction");
        self.execute(&items, LockMode::NoWait).await?;
        Ok(())
    }
}
