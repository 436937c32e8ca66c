use chrono::{DateTime, Utc};
use log::{debug, trace};
use rust_decimal::Decimal;
use sqlx::{FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Cents, DeliveryUpdate, GiftCard, LineItem, NewOrder, Order, OrderId, OrderStatusType, PaymentMethod},
    traits::{OrderQueryFilter, OrderStoreError},
};

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    order_id: OrderId,
    total: Cents,
    payment_method: PaymentMethod,
    crypto_amount: String,
    receive_address: Option<String>,
    payment_url: String,
    buyer_contact: String,
    status: OrderStatusType,
    provider_session_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    delivery_error: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct LineItemRow {
    brand: String,
    denomination: Cents,
    code: Option<String>,
    pin: Option<String>,
    fulfillment_error: Option<String>,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        Self {
            brand: row.brand,
            denomination: row.denomination,
            code: row.code,
            pin: row.pin,
            fulfillment_error: row.fulfillment_error,
        }
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<LineItem>) -> Result<Order, OrderStoreError> {
        let crypto_amount = self.crypto_amount.parse::<Decimal>().map_err(|e| {
            OrderStoreError::DatabaseError(format!("Order {} has an invalid crypto amount: {e}", self.order_id))
        })?;
        Ok(Order {
            order_id: self.order_id,
            items,
            total: self.total,
            payment_method: self.payment_method,
            crypto_amount,
            receive_address: self.receive_address,
            payment_url: self.payment_url,
            buyer_contact: self.buyer_contact,
            status: self.status,
            provider_session_id: self.provider_session_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            delivered_at: self.delivered_at,
            delivery_error: self.delivery_error,
        })
    }
}

/// Inserts a new order and its line items. This is not atomic; run it inside a transaction and pass `&mut *tx` as the
/// connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    if order_exists(&order.order_id, conn).await? {
        return Err(OrderStoreError::OrderAlreadyExists(order.order_id));
    }
    if fetch_order_row_by_session_id(&order.provider_session_id, conn).await?.is_some() {
        return Err(OrderStoreError::SessionIdInUse(order.provider_session_id));
    }
    let total = order.total();
    sqlx::query(
        r#"
            INSERT INTO orders (
                order_id,
                total,
                payment_method,
                crypto_amount,
                receive_address,
                payment_url,
                buyer_contact,
                status,
                provider_session_id,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10);
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(total)
    .bind(order.payment_method)
    .bind(order.crypto_amount.to_string())
    .bind(order.receive_address)
    .bind(order.payment_url)
    .bind(order.buyer_contact)
    .bind(OrderStatusType::Pending)
    .bind(order.provider_session_id)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;
    let mut builder = QueryBuilder::new("INSERT INTO line_items (order_id, idx, brand, denomination) ");
    #[allow(clippy::cast_possible_wrap)]
    builder.push_values(order.items.iter().enumerate(), |mut b, (idx, item)| {
        b.push_bind(order.order_id.as_str())
            .push_bind(idx as i64)
            .push_bind(item.brand.as_str())
            .push_bind(item.denomination);
    });
    builder.build().execute(&mut *conn).await?;
    debug!("🗃️ Order [{}] inserted with {} line items", order.order_id, order.items.len());
    Ok(())
}

pub async fn order_exists(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT order_id FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(row.is_some())
}

async fn fetch_order_row_by_session_id(
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE provider_session_id = $1").bind(session_id).fetch_optional(conn).await
}

async fn fetch_line_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, sqlx::Error> {
    let rows: Vec<LineItemRow> = sqlx::query_as(
        "SELECT brand, denomination, code, pin, fulfillment_error FROM line_items WHERE order_id = $1 ORDER BY idx",
    )
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(LineItem::from).collect())
}

async fn with_items(row: Option<OrderRow>, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderStoreError> {
    match row {
        Some(row) => {
            let items = fetch_line_items(&row.order_id, conn).await?;
            row.into_order(items).map(Some)
        },
        None => Ok(None),
    }
}

/// Returns the order, with its line items, for the corresponding `order_id`
pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderStoreError> {
    let row: Option<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(&mut *conn).await?;
    with_items(row, conn).await
}

pub async fn fetch_order_by_session_id(
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderStoreError> {
    let row = fetch_order_row_by_session_id(session_id, &mut *conn).await?;
    with_items(row, conn).await
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, OrderStoreError> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if !query.statuses.is_empty() {
        // Statuses come from a closed enum, so they are safe to inline
        let statuses = query.statuses.iter().map(|s| format!("'{}'", s.as_str())).collect::<Vec<_>>().join(", ");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(before) = query.updated_before {
        where_clause.push("updated_at < ");
        where_clause.push_bind_unseparated(before);
    }
    if let Some(contact) = query.buyer_contact {
        where_clause.push("buyer_contact = ");
        where_clause.push_bind_unseparated(contact);
        where_clause.push_unseparated(" COLLATE NOCASE");
    }
    builder.push(" ORDER BY created_at ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let rows: Vec<OrderRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let items = fetch_line_items(&row.order_id, &mut *conn).await?;
        orders.push(row.into_order(items)?);
    }
    Ok(orders)
}

/// Conditionally moves the order from `from` to `to`. Returns `true` if the row was updated.
///
/// Moving to `completed` additionally requires that every line item has a code.
pub async fn update_status(
    order_id: &OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let mut sql = String::from("UPDATE orders SET status = $1, updated_at = $2 WHERE order_id = $3 AND status = $4");
    if to == OrderStatusType::Completed {
        sql.push_str(" AND NOT EXISTS (SELECT 1 FROM line_items WHERE order_id = $3 AND code IS NULL)");
    }
    let result =
        sqlx::query(&sql).bind(to).bind(Utc::now()).bind(order_id.as_str()).bind(from).execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

/// Writes the gift card onto the line item, provided it has no code yet and the order is processing. Returns `true` if
/// the row was updated.
pub async fn set_item_card(
    order_id: &OrderId,
    index: i64,
    card: &GiftCard,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE line_items SET code = $1, pin = $2, fulfillment_error = NULL
            WHERE order_id = $3 AND idx = $4 AND code IS NULL
              AND EXISTS (SELECT 1 FROM orders WHERE order_id = $3 AND status = 'processing');
        "#,
    )
    .bind(card.code.as_str())
    .bind(card.pin.as_deref())
    .bind(order_id.as_str())
    .bind(index)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Records a fulfillment error on the line item, provided it has no code and the order is processing.
pub async fn set_item_error(
    order_id: &OrderId,
    index: i64,
    error: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE line_items SET fulfillment_error = $1
            WHERE order_id = $2 AND idx = $3 AND code IS NULL
              AND EXISTS (SELECT 1 FROM orders WHERE order_id = $2 AND status = 'processing');
        "#,
    )
    .bind(error)
    .bind(order_id.as_str())
    .bind(index)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn touch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET updated_at = $1 WHERE order_id = $2")
        .bind(Utc::now())
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_delivery(
    order_id: &OrderId,
    update: DeliveryUpdate,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let query = match update {
        DeliveryUpdate::Delivered => sqlx::query(
            "UPDATE orders SET delivered_at = $1, delivery_error = NULL, updated_at = $1 WHERE order_id = $2",
        )
        .bind(now)
        .bind(order_id.as_str()),
        DeliveryUpdate::Failed(reason) => {
            sqlx::query("UPDATE orders SET delivery_error = $1, updated_at = $2 WHERE order_id = $3")
                .bind(reason)
                .bind(now)
                .bind(order_id.as_str())
        },
    };
    let result = query.execute(conn).await?;
    Ok(result.rows_affected() == 1)
}
