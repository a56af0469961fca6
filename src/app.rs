use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/document", get(handlers::get_document))
        .route("/api/goals", post(handlers::add_goal))
        .route(
            "/api/goals/:index",
            put(handlers::update_goal).delete(handlers::delete_goal),
        )
        .route(
            "/api/rewards",
            get(handlers::get_rewards).post(handlers::add_reward),
        )
        .route("/api/rewards/restore", post(handlers::restore_reward))
        .route(
            "/api/rewards/:index",
            put(handlers::update_reward).delete(handlers::delete_reward),
        )
        .route(
            "/api/rewards/:index/eligible-goals",
            get(handlers::eligible_goals),
        )
        .route(
            "/api/rewards/:index/activity",
            get(handlers::activity_history).post(handlers::log_activity),
        )
        .route(
            "/api/rewards/:index/activity/:activity_index",
            delete(handlers::remove_activity),
        )
        .route(
            "/api/target",
            get(handlers::get_target).put(handlers::update_target),
        )
        .route("/api/help", get(handlers::get_help))
        .route("/api/help/hide", post(handlers::hide_help))
        .route("/api/reset", post(handlers::reset))
        .with_state(state)
}
