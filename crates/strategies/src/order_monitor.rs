use crate::error::StrategyError;
use crate::identity::StrategyIdentity;
use crate::Strategy;
use async_trait::async_trait;
use core_types::{Order, OrderStatus};
use mediator::{
    GetOrderRequest, Mediator, ReadActiveOrdersRequest, SendNotificationRequest, UpdateOrderRequest,
};
use std::sync::Weak;

/// Keeps persisted orders in step with the broker.
///
/// Every pass reads the strategy's active orders from the database, asks the broker for the
/// current state of each one, and persists any status change. Fills and cancellations are
/// announced through the notifier.
#[derive(Debug)]
pub struct OrderMonitor {
    identity: StrategyIdentity,
}

impl OrderMonitor {
    pub fn new(name: &str) -> Self {
        Self {
            identity: StrategyIdentity::new(name),
        }
    }
}

/// Copies the broker's view of an order onto the persisted copy, keeping database ids.
fn merge(persisted: &Order, latest: &Order) -> Order {
    let mut merged = persisted.clone();
    merged.status = latest.status;
    merged.closed_at = latest.closed_at;
    if merged.entered_at.is_none() {
        merged.entered_at = latest.entered_at;
    }
    for (leg, broker_leg) in merged.legs.iter_mut().zip(&latest.legs) {
        leg.filled_quantity = broker_leg.filled_quantity;
    }
    merged
}

fn announcement(name: &str, order: &Order) -> Option<String> {
    let broker_order_id = order.broker_order_id.as_deref().unwrap_or("-");
    match order.status {
        OrderStatus::Filled => Some(format!("{name}: order {broker_order_id} filled.")),
        OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired => Some(format!(
            "{name}: order {broker_order_id} closed as {}.",
            order.status
        )),
        _ => None,
    }
}

#[async_trait]
impl Strategy for OrderMonitor {
    fn strategy_name(&self) -> &str {
        self.identity.name()
    }

    fn strategy_id(&self) -> Option<i64> {
        self.identity.id()
    }

    fn bind(&self, strategy_id: i64, mediator: Weak<dyn Mediator>) -> Result<(), StrategyError> {
        self.identity.bind(strategy_id, mediator)
    }

    async fn process_strategy(&self) -> Result<(), StrategyError> {
        let (strategy_id, mediator) = self.identity.context()?;
        let name = self.identity.name();

        let Some(active) = mediator
            .read_active_orders(&ReadActiveOrdersRequest { strategy_id })
            .await?
        else {
            return Ok(());
        };

        for persisted in &active.orders {
            let Some(broker_order_id) = persisted.broker_order_id.clone() else {
                tracing::debug!(strategy = %name, order_id = ?persisted.id, "Order has not reached the broker yet.");
                continue;
            };

            let request = GetOrderRequest {
                strategy_id,
                broker_order_id,
            };
            let Some(latest) = mediator.get_order(&request).await? else {
                tracing::warn!(strategy = %name, broker_order_id = %request.broker_order_id, "Broker does not know the order.");
                continue;
            };
            if latest.order.status == persisted.status {
                continue;
            }

            let updated = merge(persisted, &latest.order);
            mediator
                .update_db_order(&UpdateOrderRequest {
                    order: updated.clone(),
                })
                .await?;
            tracing::info!(
                strategy = %name,
                broker_order_id = %request.broker_order_id,
                from = %persisted.status,
                to = %updated.status,
                "Order status changed."
            );

            if let Some(message) = announcement(name, &updated) {
                mediator
                    .send_notification(&SendNotificationRequest::new(message))
                    .await;
            }
        }
        Ok(())
    }
}
