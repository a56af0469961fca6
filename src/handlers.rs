use crate::backend::FileBackend;
use crate::errors::{AppError, StoreError};
use crate::models::{
    validate_target, ActivityEntry, ActivityRequest, Document, Goal, GoalRequest, HelpResponse,
    RestoreRewardRequest, Reward, RewardRequest, TargetRequest, TargetResponse,
};
use crate::state::AppState;
use crate::store::DocumentStore;
use crate::views::{
    activity_history as history_of, eligible_goals_for_logging, partition_rewards,
    RewardPartition,
};
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

pub async fn get_document(State(state): State<AppState>) -> Result<Json<Document>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(current(&store)?))
}

pub async fn get_rewards(State(state): State<AppState>) -> Result<Json<RewardPartition>, AppError> {
    let store = state.store.lock().await;
    let doc = current(&store)?;
    Ok(Json(partition_rewards(&doc)))
}

pub async fn add_goal(
    State(state): State<AppState>,
    Json(payload): Json<GoalRequest>,
) -> Result<Json<Document>, AppError> {
    let mut store = state.store.lock().await;
    store.add_goal(&payload.name, payload.required)?;
    Ok(Json(current(&store)?))
}

pub async fn update_goal(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(payload): Json<GoalRequest>,
) -> Result<Json<Document>, AppError> {
    let mut store = state.store.lock().await;
    store.update_goal(index, &payload.name, payload.required)?;
    Ok(Json(current(&store)?))
}

pub async fn delete_goal(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<Document>, AppError> {
    let mut store = state.store.lock().await;
    let removed = store.delete_goal(index)?;
    info!("deleted goal '{}'", removed.name);
    Ok(Json(current(&store)?))
}

pub async fn add_reward(
    State(state): State<AppState>,
    Json(payload): Json<RewardRequest>,
) -> Result<Json<Document>, AppError> {
    let mut store = state.store.lock().await;
    store.add_reward(&payload.name)?;
    Ok(Json(current(&store)?))
}

pub async fn update_reward(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(payload): Json<RewardRequest>,
) -> Result<Json<Document>, AppError> {
    let mut store = state.store.lock().await;
    store.update_reward(index, &payload.name)?;
    Ok(Json(current(&store)?))
}

/// Responds with the removed reward so the caller can hold it for undo.
pub async fn delete_reward(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<Reward>, AppError> {
    let mut store = state.store.lock().await;
    let removed = store.delete_reward(index)?;
    info!(
        "deleted reward '{}' with {} activities",
        removed.reward_name,
        removed.activity.len()
    );
    Ok(Json(removed))
}

pub async fn restore_reward(
    State(state): State<AppState>,
    Json(payload): Json<RestoreRewardRequest>,
) -> Result<Json<Document>, AppError> {
    let mut store = state.store.lock().await;
    store.restore_reward(payload.reward)?;
    Ok(Json(current(&store)?))
}

pub async fn eligible_goals(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<Vec<Goal>>, AppError> {
    let store = state.store.lock().await;
    let doc = current(&store)?;
    let goals = eligible_goals_for_logging(&doc, index).ok_or(StoreError::RewardNotFound(index))?;
    Ok(Json(goals.into_iter().cloned().collect()))
}

pub async fn activity_history(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<Vec<ActivityEntry>>, AppError> {
    let store = state.store.lock().await;
    let doc = current(&store)?;
    let history = history_of(&doc, index).ok_or(StoreError::RewardNotFound(index))?;
    Ok(Json(history))
}

pub async fn log_activity(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(payload): Json<ActivityRequest>,
) -> Result<Json<ActivityEntry>, AppError> {
    let mut store = state.store.lock().await;
    let entry = store.log_completion_today(index, &payload.goal)?;
    Ok(Json(ActivityEntry::parse(&entry)))
}

pub async fn remove_activity(
    State(state): State<AppState>,
    Path((index, activity_index)): Path<(usize, usize)>,
) -> Result<Json<Document>, AppError> {
    let mut store = state.store.lock().await;
    store.remove_activity_from_reward(index, activity_index)?;
    Ok(Json(current(&store)?))
}

pub async fn get_target(State(state): State<AppState>) -> Json<TargetResponse> {
    let store = state.store.lock().await;
    Json(TargetResponse {
        target: store.target(),
    })
}

pub async fn update_target(
    State(state): State<AppState>,
    Json(payload): Json<TargetRequest>,
) -> Result<Json<TargetResponse>, AppError> {
    let target = validate_target(payload.target)?;
    let mut store = state.store.lock().await;
    store.update_target(target)?;
    Ok(Json(TargetResponse { target }))
}

pub async fn get_help(State(state): State<AppState>) -> Json<HelpResponse> {
    let store = state.store.lock().await;
    Json(HelpResponse {
        show_help: store.should_show_help(),
    })
}

pub async fn hide_help(State(state): State<AppState>) -> Result<Json<HelpResponse>, AppError> {
    let mut store = state.store.lock().await;
    store.hide_help()?;
    Ok(Json(HelpResponse { show_help: false }))
}

/// Clears everything and starts over from the default document.
pub async fn reset(State(state): State<AppState>) -> Result<Json<Document>, AppError> {
    let mut store = state.store.lock().await;
    store.reset_to_defaults()?;
    let doc = store.initialize()?;
    Ok(Json(doc))
}

fn current(store: &DocumentStore<FileBackend>) -> Result<Document, StoreError> {
    store.get_document().ok_or(StoreError::NoDocument)
}
