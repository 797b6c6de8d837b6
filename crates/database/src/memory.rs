use crate::{Database, DbError};
use async_trait::async_trait;
use core_types::{Order, OrderStatus, StrategyRecord};
use mediator::{
    CreateOrderRequest, CreateOrderResponse, CreateStrategyRequest, CreateStrategyResponse,
    ReadActiveOrdersRequest, ReadActiveOrdersResponse, ReadOffsetLegsByExpirationRequest,
    ReadOffsetLegsByExpirationResponse, ReadStrategyByNameRequest, ReadStrategyByNameResponse,
    UpdateOrderRequest, UpdateOrderResponse,
};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    strategies: Vec<StrategyRecord>,
    orders: BTreeMap<i64, Order>,
    last_strategy_id: i64,
    last_order_id: i64,
    last_leg_id: i64,
}

/// A process-local `Database`. Ids are assigned sequentially from 1, like a fresh
/// `BIGSERIAL` column.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    state: Mutex<MemoryState>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of a stored order.
    pub async fn order(&self, id: i64) -> Option<Order> {
        self.state.lock().await.orders.get(&id).cloned()
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn read_first_strategy_by_name(
        &self,
        request: &ReadStrategyByNameRequest,
    ) -> Result<ReadStrategyByNameResponse, DbError> {
        let state = self.state.lock().await;
        let strategy = state
            .strategies
            .iter()
            .find(|s| s.name == request.name)
            .cloned();
        Ok(ReadStrategyByNameResponse { strategy })
    }

    async fn create_strategy(
        &self,
        request: &CreateStrategyRequest,
    ) -> Result<CreateStrategyResponse, DbError> {
        let mut state = self.state.lock().await;
        if state.strategies.iter().any(|s| s.name == request.strategy.name) {
            return Err(DbError::DuplicateStrategy(request.strategy.name.clone()));
        }

        state.last_strategy_id += 1;
        let id = state.last_strategy_id;
        state.strategies.push(StrategyRecord {
            id: Some(id),
            ..request.strategy.clone()
        });
        tracing::debug!(id, name = %request.strategy.name, "Created strategy record.");
        Ok(CreateStrategyResponse { id })
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<Option<CreateOrderResponse>, DbError> {
        let mut state = self.state.lock().await;
        state.last_order_id += 1;
        let id = state.last_order_id;

        let mut order = request.order.clone();
        order.id = Some(id);
        for leg in &mut order.legs {
            state.last_leg_id += 1;
            leg.id = Some(state.last_leg_id);
            leg.order_id = Some(id);
        }
        state.orders.insert(id, order);
        Ok(Some(CreateOrderResponse { id }))
    }

    async fn update_order(
        &self,
        request: &UpdateOrderRequest,
    ) -> Result<Option<UpdateOrderResponse>, DbError> {
        let Some(id) = request.order.id else {
            return Ok(None);
        };
        let mut state = self.state.lock().await;
        let Some(stored) = state.orders.get_mut(&id) else {
            return Ok(None);
        };

        stored.broker_order_id = request.order.broker_order_id.clone();
        stored.status = request.order.status;
        stored.price = request.order.price;
        stored.quantity = request.order.quantity;
        stored.entered_at = request.order.entered_at;
        stored.closed_at = request.order.closed_at;
        for update in &request.order.legs {
            if let Some(leg) = stored.legs.iter_mut().find(|l| l.id.is_some() && l.id == update.id) {
                leg.filled_quantity = update.filled_quantity;
            }
        }
        Ok(Some(UpdateOrderResponse { id }))
    }

    async fn read_active_orders(
        &self,
        request: &ReadActiveOrdersRequest,
    ) -> Result<Option<ReadActiveOrdersResponse>, DbError> {
        let state = self.state.lock().await;
        let orders = state
            .orders
            .values()
            .filter(|o| o.strategy_id == request.strategy_id && o.status.is_active())
            .cloned()
            .collect();
        Ok(Some(ReadActiveOrdersResponse { orders }))
    }

    async fn read_offset_legs_by_expiration(
        &self,
        request: &ReadOffsetLegsByExpirationRequest,
    ) -> Result<Option<ReadOffsetLegsByExpirationResponse>, DbError> {
        let state = self.state.lock().await;
        let offset_legs = state
            .orders
            .values()
            .filter(|o| o.strategy_id == request.strategy_id && o.status == OrderStatus::Filled)
            .flat_map(|o| o.legs.iter())
            .filter(|leg| {
                leg.instruction.is_opening()
                    && leg.put_call == Some(request.put_call)
                    && leg.expiration == Some(request.expiration)
            })
            .cloned()
            .collect();
        Ok(Some(ReadOffsetLegsByExpirationResponse { offset_legs }))
    }
}
