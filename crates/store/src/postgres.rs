use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, OrderId};
use domain::{
    Category, EmailAddress, InventoryItem, ItemStatus, NewInventoryItem, NewOrder, Order,
    OrderStatus, ProcessedEvent, ProcessingOutcome, ProviderEventId, SessionId,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{ClaimOutcome, FulfillmentStore, OrderOutcome, ReserveOutcome, ReserveRequest},
};

const ITEM_COLUMNS: &str = "id, category, login, password, status, assigned_to, assigned_at, \
                            order_id, expires_at, created_at, notes";
const ORDER_COLUMNS: &str =
    "id, customer_email, session_id, product, amount_cents, currency, status, created_at";

/// PostgreSQL-backed fulfillment store.
#[derive(Clone)]
pub struct PgFulfillmentStore {
    pool: PgPool,
}

impl PgFulfillmentStore {
    /// Creates a new PostgreSQL fulfillment store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_email: EmailAddress::parse(row.try_get::<String, _>("customer_email")?)?,
            session_id: SessionId::new(row.try_get::<String, _>("session_id")?)?,
            product: row.try_get("product")?,
            amount: domain::Money::from_cents(row.try_get("amount_cents")?),
            currency: row.try_get("currency")?,
            status: OrderStatus::from_str(&status)?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<InventoryItem> {
        let category: String = row.try_get("category")?;
        let status: String = row.try_get("status")?;
        let assigned_to: Option<String> = row.try_get("assigned_to")?;
        Ok(InventoryItem {
            id: ItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            category: Category::from_str(&category)?,
            login: row.try_get("login")?,
            password: row.try_get("password")?,
            status: ItemStatus::from_str(&status)?,
            assigned_to: assigned_to.map(EmailAddress::parse).transpose()?,
            assigned_at: row.try_get("assigned_at")?,
            order_id: row
                .try_get::<Option<Uuid>, _>("order_id")?
                .map(OrderId::from_uuid),
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
            notes: row.try_get("notes")?,
        })
    }
}

#[async_trait]
impl FulfillmentStore for PgFulfillmentStore {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<()> {
        Ok(tx.commit().await?)
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<()> {
        Ok(tx.rollback().await?)
    }

    async fn claim_event(
        &self,
        tx: &mut Self::Tx,
        event_id: &ProviderEventId,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, outcome, processed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id.as_str())
        .bind(ProcessingOutcome::Pending.as_str())
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 1 {
            Ok(ClaimOutcome::Claimed)
        } else {
            Ok(ClaimOutcome::AlreadyProcessed)
        }
    }

    async fn record_outcome(
        &self,
        tx: &mut Self::Tx,
        event_id: &ProviderEventId,
        outcome: ProcessingOutcome,
    ) -> Result<()> {
        sqlx::query("UPDATE processed_events SET outcome = $2 WHERE event_id = $1")
            .bind(event_id.as_str())
            .bind(outcome.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn insert_order(
        &self,
        tx: &mut Self::Tx,
        order: NewOrder,
        now: DateTime<Utc>,
    ) -> Result<OrderOutcome> {
        let order = order.into_order(now);
        let result = sqlx::query(
            r#"
            INSERT INTO orders (id, customer_email, session_id, product, amount_cents, currency, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_email.as_str())
        .bind(order.session_id.as_str())
        .bind(&order.product)
        .bind(order.amount.cents())
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 1 {
            Ok(OrderOutcome::Created(order))
        } else {
            Ok(OrderOutcome::DuplicateSession)
        }
    }

    async fn reserve_item(
        &self,
        tx: &mut Self::Tx,
        request: ReserveRequest,
    ) -> Result<ReserveOutcome> {
        // Single atomic select-and-update: the inner select takes a row
        // lock, SKIP LOCKED keeps concurrent reservations off the same row.
        let row = sqlx::query(&format!(
            r#"
            UPDATE inventory_items
            SET status = 'assigned', assigned_to = $1, assigned_at = $2, order_id = $3, expires_at = $4
            WHERE id = (
                SELECT id FROM inventory_items
                WHERE category = $5 AND status = 'available'
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(request.customer.as_str())
        .bind(request.assigned_at)
        .bind(request.order_id.as_uuid())
        .bind(request.expires_at)
        .bind(request.category.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some(row) => Ok(ReserveOutcome::Allocated(Self::row_to_item(row)?)),
            None => Ok(ReserveOutcome::OutOfStock),
        }
    }

    async fn release_item(&self, item_id: ItemId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE inventory_items SET status = 'expired' WHERE id = $1 AND status = 'assigned'",
        )
        .bind(item_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET status = 'expired'
            WHERE status = 'assigned' AND expires_at IS NOT NULL AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            tracing::debug!(swept, "expired elapsed inventory assignments");
        }
        Ok(swept)
    }

    async fn restock(
        &self,
        items: Vec<NewInventoryItem>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ItemId>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(items.len());

        for input in items {
            let item = InventoryItem::available(input, now);
            sqlx::query(
                r#"
                INSERT INTO inventory_items (id, category, login, password, status, created_at, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.category.as_str())
            .bind(&item.login)
            .bind(&item.password)
            .bind(item.status.as_str())
            .bind(item.created_at)
            .bind(&item.notes)
            .execute(&mut *tx)
            .await?;
            ids.push(item.id);
        }

        tx.commit().await?;
        tracing::debug!(count = ids.len(), "restocked inventory items");
        Ok(ids)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn find_order_by_session(&self, session_id: &SessionId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE session_id = $1"
        ))
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<InventoryItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_item).transpose()
    }

    async fn available_count(&self, category: Category) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inventory_items WHERE category = $1 AND status = 'available'",
        )
        .bind(category.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn get_processed_event(
        &self,
        event_id: &ProviderEventId,
    ) -> Result<Option<ProcessedEvent>> {
        let row = sqlx::query(
            "SELECT event_id, outcome, processed_at FROM processed_events WHERE event_id = $1",
        )
        .bind(event_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let outcome: String = row.try_get("outcome")?;
                Ok(Some(ProcessedEvent {
                    event_id: ProviderEventId::new(row.try_get::<String, _>("event_id")?)
                        .map_err(StoreError::from)?,
                    outcome: ProcessingOutcome::from_str(&outcome)?,
                    processed_at: row.try_get("processed_at")?,
                }))
            }
            None => Ok(None),
        }
    }
}
