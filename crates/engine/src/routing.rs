use crate::bot::Bot;
use async_trait::async_trait;
use broker::Broker;
use mediator::*;
use std::sync::Arc;

impl Bot {
    /// Resolves the broker for a routed request. A miss is expected and only logged at debug.
    fn route<R: Routed>(&self, operation: &'static str, request: &R) -> Option<&Arc<dyn Broker>> {
        let strategy_id = request.strategy_id();
        let broker = self.get_broker(strategy_id);
        if broker.is_none() {
            tracing::debug!(operation, strategy_id, "No broker bound to strategy.");
        }
        broker
    }
}

#[async_trait]
impl Mediator for Bot {
    async fn get_account(
        &self,
        request: &GetAccountRequest,
    ) -> Result<Option<GetAccountResponse>, MediatorError> {
        let Some(broker) = self.route("get_account", request) else {
            return Ok(None);
        };
        Ok(broker.get_account(request).await?)
    }

    /// One account per distinct broker, each fetched through the first strategy bound to it.
    /// Brokers with nothing to report are skipped; a failing broker fails the whole call.
    async fn get_all_accounts(
        &self,
        request: &GetAllAccountsRequest,
    ) -> Result<GetAllAccountsResponse, MediatorError> {
        let mut accounts = Vec::new();
        for binding in self.distinct_brokers() {
            let per_broker = GetAccountRequest {
                strategy_id: binding.strategy_id(),
                orders: request.orders,
                positions: request.positions,
            };
            if let Some(account) = self.get_account(&per_broker).await? {
                accounts.push(account);
            }
        }
        Ok(GetAllAccountsResponse { accounts })
    }

    async fn place_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<Option<PlaceOrderResponse>, MediatorError> {
        let Some(broker) = self.route("place_order", request) else {
            return Ok(None);
        };
        Ok(broker.place_order(request).await?)
    }

    async fn cancel_order(
        &self,
        request: &CancelOrderRequest,
    ) -> Result<Option<CancelOrderResponse>, MediatorError> {
        let Some(broker) = self.route("cancel_order", request) else {
            return Ok(None);
        };
        Ok(broker.cancel_order(request).await?)
    }

    async fn get_order(
        &self,
        request: &GetOrderRequest,
    ) -> Result<Option<GetOrderResponse>, MediatorError> {
        let Some(broker) = self.route("get_order", request) else {
            return Ok(None);
        };
        Ok(broker.get_order(request).await?)
    }

    async fn get_market_hours(
        &self,
        request: &GetMarketHoursRequest,
    ) -> Result<Option<GetMarketHoursResponse>, MediatorError> {
        let Some(broker) = self.route("get_market_hours", request) else {
            return Ok(None);
        };
        Ok(broker.get_market_hours(request).await?)
    }

    async fn get_quote(
        &self,
        request: &GetQuoteRequest,
    ) -> Result<Option<GetQuoteResponse>, MediatorError> {
        let Some(broker) = self.route("get_quote", request) else {
            return Ok(None);
        };
        Ok(broker.get_quote(request).await?)
    }

    async fn get_option_chain(
        &self,
        request: &GetOptionChainRequest,
    ) -> Result<Option<GetOptionChainResponse>, MediatorError> {
        let Some(broker) = self.route("get_option_chain", request) else {
            return Ok(None);
        };
        Ok(broker.get_option_chain(request).await?)
    }

    async fn send_notification(&self, request: &SendNotificationRequest) {
        if let Err(e) = self.notifier.send_notification(request).await {
            tracing::warn!(error = %e, message = %request.message, "Failed to deliver notification.");
        }
    }

    fn set_kill_switch(&self, request: &SetKillSwitchRequest) {
        tracing::info!(kill_switch = request.kill_switch, "Kill switch set.");
        self.state.set_kill_switch(request.kill_switch);
    }

    fn pause_bot(&self) {
        tracing::info!("Bot paused.");
        self.state.set_paused(true);
    }

    fn resume_bot(&self) {
        tracing::info!("Bot resumed.");
        self.state.set_paused(false);
    }

    fn get_all_strategies(&self) -> Vec<String> {
        self.bindings
            .iter()
            .map(|b| b.strategy_name().to_string())
            .collect()
    }

    async fn create_db_strategy(
        &self,
        request: &CreateStrategyRequest,
    ) -> Result<CreateStrategyResponse, MediatorError> {
        Ok(self.database.create_strategy(request).await?)
    }

    async fn create_db_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<Option<CreateOrderResponse>, MediatorError> {
        Ok(self.database.create_order(request).await?)
    }

    async fn update_db_order(
        &self,
        request: &UpdateOrderRequest,
    ) -> Result<Option<UpdateOrderResponse>, MediatorError> {
        Ok(self.database.update_order(request).await?)
    }

    async fn read_active_orders(
        &self,
        request: &ReadActiveOrdersRequest,
    ) -> Result<Option<ReadActiveOrdersResponse>, MediatorError> {
        Ok(self.database.read_active_orders(request).await?)
    }

    async fn read_offset_legs_by_expiration(
        &self,
        request: &ReadOffsetLegsByExpirationRequest,
    ) -> Result<Option<ReadOffsetLegsByExpirationResponse>, MediatorError> {
        Ok(self.database.read_offset_legs_by_expiration(request).await?)
    }
}
