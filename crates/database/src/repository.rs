use crate::{Database, DbError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{Order, OrderInstruction, OrderLeg, OrderStatus, PutCall, StrategyRecord};
use mediator::{
    CreateOrderRequest, CreateOrderResponse, CreateStrategyRequest, CreateStrategyResponse,
    ReadActiveOrdersRequest, ReadActiveOrdersResponse, ReadOffsetLegsByExpirationRequest,
    ReadOffsetLegsByExpirationResponse, ReadStrategyByNameRequest, ReadStrategyByNameResponse,
    UpdateOrderRequest, UpdateOrderResponse,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{FromRow, Transaction};
use std::collections::HashMap;

const ORDER_COLUMNS: &str = "id, strategy_id, broker_order_id, order_type, status, price, quantity, \
     duration, session, entered_at, closed_at";

/// Text codes of the opening instructions, bound as the `ANY($n)` filter for offset legs.
fn opening_codes() -> Vec<&'static str> {
    OrderInstruction::OPENING.iter().map(OrderInstruction::as_str).collect()
}

const LEG_COLUMNS: &str = "id, order_id, symbol, asset_type, instruction, quantity, filled_quantity, \
     put_call, strike, expiration";

/// A `Database` backed by PostgreSQL. Enum fields are stored as their text codes.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

// This struct represents a row fetched from the strategies table.
#[derive(Debug, Clone, FromRow)]
struct DbStrategy {
    id: i64,
    name: String,
    active: bool,
}

#[derive(Debug, Clone, FromRow)]
struct DbOrder {
    id: i64,
    strategy_id: i64,
    broker_order_id: Option<String>,
    order_type: String,
    status: String,
    price: Decimal,
    quantity: Decimal,
    duration: String,
    session: String,
    entered_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
struct DbLeg {
    id: i64,
    order_id: i64,
    symbol: String,
    asset_type: String,
    instruction: String,
    quantity: Decimal,
    filled_quantity: Decimal,
    put_call: Option<String>,
    strike: Option<Decimal>,
    expiration: Option<NaiveDate>,
}

impl From<DbStrategy> for StrategyRecord {
    fn from(row: DbStrategy) -> Self {
        StrategyRecord {
            id: Some(row.id),
            name: row.name,
            active: row.active,
        }
    }
}

impl DbOrder {
    fn into_order(self, legs: Vec<OrderLeg>) -> Result<Order, DbError> {
        Ok(Order {
            id: Some(self.id),
            strategy_id: self.strategy_id,
            broker_order_id: self.broker_order_id,
            order_type: self.order_type.parse()?,
            status: self.status.parse()?,
            price: self.price,
            quantity: self.quantity,
            duration: self.duration.parse()?,
            session: self.session.parse()?,
            legs,
            entered_at: self.entered_at,
            closed_at: self.closed_at,
        })
    }
}

impl TryFrom<DbLeg> for OrderLeg {
    type Error = DbError;

    fn try_from(row: DbLeg) -> Result<Self, Self::Error> {
        Ok(OrderLeg {
            id: Some(row.id),
            order_id: Some(row.order_id),
            symbol: row.symbol,
            asset_type: row.asset_type.parse()?,
            instruction: row.instruction.parse()?,
            quantity: row.quantity,
            filled_quantity: row.filled_quantity,
            put_call: row.put_call.as_deref().map(str::parse::<PutCall>).transpose()?,
            strike: row.strike,
            expiration: row.expiration,
        })
    }
}

impl PgDatabase {
    /// Creates a new `PgDatabase` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_legs(
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
        legs: &[OrderLeg],
    ) -> Result<(), DbError> {
        for leg in legs {
            sqlx::query(
                "INSERT INTO legs (order_id, symbol, asset_type, instruction, quantity, filled_quantity, put_call, strike, expiration) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(order_id)
            .bind(&leg.symbol)
            .bind(leg.asset_type.as_str())
            .bind(leg.instruction.as_str())
            .bind(leg.quantity)
            .bind(leg.filled_quantity)
            .bind(leg.put_call.map(|pc| pc.as_str()))
            .bind(leg.strike)
            .bind(leg.expiration)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Loads the legs of `order_ids`, grouped by order.
    async fn legs_for_orders(&self, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderLeg>>, DbError> {
        let query = format!("SELECT {LEG_COLUMNS} FROM legs WHERE order_id = ANY($1) ORDER BY id");
        let rows = sqlx::query_as::<_, DbLeg>(&query)
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<i64, Vec<OrderLeg>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            grouped.entry(order_id).or_default().push(OrderLeg::try_from(row)?);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn read_first_strategy_by_name(
        &self,
        request: &ReadStrategyByNameRequest,
    ) -> Result<ReadStrategyByNameResponse, DbError> {
        let row = sqlx::query_as::<_, DbStrategy>(
            "SELECT id, name, active FROM strategies WHERE name = $1 ORDER BY id LIMIT 1",
        )
        .bind(&request.name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ReadStrategyByNameResponse {
            strategy: row.map(StrategyRecord::from),
        })
    }

    async fn create_strategy(
        &self,
        request: &CreateStrategyRequest,
    ) -> Result<CreateStrategyResponse, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO strategies (name, active) VALUES ($1, $2) RETURNING id",
        )
        .bind(&request.strategy.name)
        .bind(request.strategy.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return DbError::DuplicateStrategy(request.strategy.name.clone());
                }
            }
            DbError::QueryError(e)
        })?;

        tracing::info!(id, name = %request.strategy.name, "Created strategy record.");
        Ok(CreateStrategyResponse { id })
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<Option<CreateOrderResponse>, DbError> {
        let order = &request.order;
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO orders (strategy_id, broker_order_id, order_type, status, price, quantity, duration, session, entered_at, closed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(order.strategy_id)
        .bind(&order.broker_order_id)
        .bind(order.order_type.as_str())
        .bind(order.status.as_str())
        .bind(order.price)
        .bind(order.quantity)
        .bind(order.duration.as_str())
        .bind(order.session.as_str())
        .bind(order.entered_at)
        .bind(order.closed_at)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_legs(&mut tx, id, &order.legs).await?;
        tx.commit().await?;

        Ok(Some(CreateOrderResponse { id }))
    }

    async fn update_order(
        &self,
        request: &UpdateOrderRequest,
    ) -> Result<Option<UpdateOrderResponse>, DbError> {
        let order = &request.order;
        let Some(id) = order.id else {
            return Ok(None);
        };
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE orders SET broker_order_id = $2, status = $3, price = $4, quantity = $5, entered_at = $6, closed_at = $7 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&order.broker_order_id)
        .bind(order.status.as_str())
        .bind(order.price)
        .bind(order.quantity)
        .bind(order.entered_at)
        .bind(order.closed_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Ok(None);
        }

        for leg in &order.legs {
            if let Some(leg_id) = leg.id {
                sqlx::query("UPDATE legs SET filled_quantity = $3 WHERE id = $1 AND order_id = $2")
                    .bind(leg_id)
                    .bind(id)
                    .bind(leg.filled_quantity)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;

        Ok(Some(UpdateOrderResponse { id }))
    }

    async fn read_active_orders(
        &self,
        request: &ReadActiveOrdersRequest,
    ) -> Result<Option<ReadActiveOrdersResponse>, DbError> {
        let active: Vec<String> = OrderStatus::ACTIVE.iter().map(|s| s.to_string()).collect();
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE strategy_id = $1 AND status = ANY($2) ORDER BY id"
        );
        let rows = sqlx::query_as::<_, DbOrder>(&query)
            .bind(request.strategy_id)
            .bind(&active)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut legs = self.legs_for_orders(&ids).await?;

        let orders = rows
            .into_iter()
            .map(|row| {
                let order_legs = legs.remove(&row.id).unwrap_or_default();
                row.into_order(order_legs)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ReadActiveOrdersResponse { orders }))
    }

    async fn read_offset_legs_by_expiration(
        &self,
        request: &ReadOffsetLegsByExpirationRequest,
    ) -> Result<Option<ReadOffsetLegsByExpirationResponse>, DbError> {
        let opening = opening_codes();

        let rows = sqlx::query_as::<_, DbLeg>(
            "SELECT l.id, l.order_id, l.symbol, l.asset_type, l.instruction, l.quantity, l.filled_quantity, \
                    l.put_call, l.strike, l.expiration \
             FROM legs AS l \
             JOIN orders AS o ON o.id = l.order_id \
             WHERE o.strategy_id = $1 AND o.status = $2 AND l.put_call = $3 AND l.expiration = $4 \
               AND l.instruction = ANY($5) \
             ORDER BY l.id",
        )
        .bind(request.strategy_id)
        .bind(OrderStatus::Filled.as_str())
        .bind(request.put_call.as_str())
        .bind(request.expiration)
        .bind(&opening)
        .fetch_all(&self.pool)
        .await?;

        let offset_legs = rows
            .into_iter()
            .map(OrderLeg::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ReadOffsetLegsByExpirationResponse { offset_legs }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_legs_filter_on_the_opening_codes() {
        assert_eq!(opening_codes(), ["BUY", "BUY_TO_OPEN", "SELL_TO_OPEN"]);
        for code in opening_codes() {
            let instruction: OrderInstruction = code.parse().unwrap();
            assert!(instruction.is_opening());
        }
    }
}
