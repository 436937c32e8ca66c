//! `SqliteDatabase` is the durable [`OrderStore`] backend.
//!
//! Every mutating call runs in its own transaction. Status changes are conditional `UPDATE`s on the current status, and
//! gift card writes are conditional on the code still being empty, so the row counts reported by SQLite decide which
//! of several concurrent callers wins.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{db_url, new_pool, orders};
use crate::{
    db::common::{check_item_write, check_transition, ItemWrite},
    db_types::{DeliveryUpdate, GiftCard, NewOrder, Order, OrderId, OrderStatusType},
    traits::{OrderQueryFilter, OrderStore, OrderStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let order_id = order.order_id.clone();
        let mut tx = self.pool.begin().await?;
        orders::insert_order(order, &mut tx).await?;
        let order = orders::fetch_order(&order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderStoreError::DatabaseError(format!("Order {order_id} vanished after insert")))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn fetch_order_by_session_id(&self, session_id: &str) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_session_id(session_id, &mut conn).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(query, &mut conn).await
    }

    async fn transition_status(
        &self,
        order_id: &OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, OrderStoreError> {
        check_transition(from, to)?;
        let mut tx = self.pool.begin().await?;
        if !orders::update_status(order_id, from, to, &mut tx).await? {
            let current = orders::fetch_order(order_id, &mut tx).await?;
            if let Some(order) = current {
                if to == OrderStatusType::Completed && order.status == from {
                    return Err(OrderStoreError::UnfulfilledItems(order_id.clone()));
                }
                trace!("🗃️ Order [{order_id}] is {}, not {from}. Not moving it to {to}", order.status);
            }
            return Ok(None);
        }
        let order = orders::fetch_order(order_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] moved from {from} to {to}");
        Ok(order)
    }

    async fn record_gift_card(
        &self,
        order_id: &OrderId,
        index: usize,
        card: &GiftCard,
    ) -> Result<Order, OrderStoreError> {
        let idx = i64::try_from(index).map_err(|_| OrderStoreError::LineItemNotFound(order_id.clone(), index))?;
        let mut tx = self.pool.begin().await?;
        let updated = orders::set_item_card(order_id, idx, card, &mut tx).await?;
        if updated {
            orders::touch_order(order_id, &mut tx).await?;
        }
        let order = orders::fetch_order(order_id, &mut tx).await?;
        if !updated {
            // Work out why nothing changed
            return match check_item_write(order.as_ref(), order_id, index, Some(card))? {
                ItemWrite::AlreadyRecorded => {
                    order.ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))
                },
                ItemWrite::Apply => Err(OrderStoreError::DatabaseError(format!(
                    "Line item {index} of order {order_id} could not be updated"
                ))),
            };
        }
        tx.commit().await?;
        debug!("🗃️ Gift card recorded for item {index} of order [{order_id}]");
        order.ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))
    }

    async fn record_item_error(&self, order_id: &OrderId, index: usize, error: &str) -> Result<Order, OrderStoreError> {
        let idx = i64::try_from(index).map_err(|_| OrderStoreError::LineItemNotFound(order_id.clone(), index))?;
        let mut tx = self.pool.begin().await?;
        let updated = orders::set_item_error(order_id, idx, error, &mut tx).await?;
        if updated {
            orders::touch_order(order_id, &mut tx).await?;
        }
        let order = orders::fetch_order(order_id, &mut tx).await?;
        if !updated {
            check_item_write(order.as_ref(), order_id, index, None)?;
            return Err(OrderStoreError::DatabaseError(format!(
                "Line item {index} of order {order_id} could not be updated"
            )));
        }
        tx.commit().await?;
        debug!("🗃️ Fulfillment error recorded for item {index} of order [{order_id}]");
        order.ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))
    }

    async fn record_delivery(&self, order_id: &OrderId, update: DeliveryUpdate) -> Result<Order, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        if !orders::set_delivery(order_id, update, &mut tx).await? {
            return Err(OrderStoreError::OrderNotFound(order_id.clone()));
        }
        let order = orders::fetch_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn close(&mut self) -> Result<(), OrderStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `GCM_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Creates the database file if it does not exist yet, and brings the schema up to date.
    pub async fn create_and_migrate(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        use sqlx::{migrate::MigrateDatabase, Sqlite};
        if !Sqlite::database_exists(url).await? {
            info!("🗃️ Creating new database at {url}");
            Sqlite::create_database(url).await?;
        }
        let db = Self::new_with_url(url, max_connections).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
