use crate::{AppState, error::AppError};
use axum::{
    Json,
    extract::{Query, State},
};
use engine::BotStatus;
use mediator::{GetAllAccountsRequest, GetAllAccountsResponse, Mediator, SetKillSwitchRequest};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct StatusView {
    pub status: BotStatus,
    pub strategies: usize,
    pub loop_period_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct StrategyView {
    pub id: i64,
    pub name: String,
}

fn status_view(state: &AppState) -> StatusView {
    StatusView {
        status: state.bot.status(),
        strategies: state.bot.bindings().len(),
        loop_period_secs: state.bot.settings().loop_period.as_secs(),
    }
}

/// # GET /api/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusView> {
    Json(status_view(&state))
}

/// # GET /api/strategies
/// Bound strategies with their persisted ids, in binding order.
pub async fn get_strategies(State(state): State<Arc<AppState>>) -> Json<Vec<StrategyView>> {
    let strategies = state
        .bot
        .bindings()
        .iter()
        .map(|binding| StrategyView {
            id: binding.strategy_id(),
            name: binding.strategy_name().to_string(),
        })
        .collect();
    Json(strategies)
}

/// # GET /api/accounts?orders=true&positions=true
/// One account snapshot per distinct broker.
pub async fn get_accounts(
    State(state): State<Arc<AppState>>,
    Query(request): Query<GetAllAccountsRequest>,
) -> Result<Json<GetAllAccountsResponse>, AppError> {
    let accounts = state.bot.get_all_accounts(&request).await?;
    Ok(Json(accounts))
}

/// # POST /api/bot/pause
pub async fn pause(State(state): State<Arc<AppState>>) -> Json<StatusView> {
    state.bot.pause_bot();
    Json(status_view(&state))
}

/// # POST /api/bot/resume
pub async fn resume(State(state): State<Arc<AppState>>) -> Json<StatusView> {
    state.bot.resume_bot();
    Json(status_view(&state))
}

/// # POST /api/bot/kill-switch
/// Body: `{"kill_switch": true}`. The loop stops after its current pass.
pub async fn set_kill_switch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetKillSwitchRequest>,
) -> Json<StatusView> {
    state.bot.set_kill_switch(&request);
    Json(status_view(&state))
}
