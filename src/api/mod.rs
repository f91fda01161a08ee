mod handlers;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::graph::{GoalGraph, LayoutState};

/// Shared state behind every handler.
///
/// The goal graph is loaded once and kept in memory; it is the single writer,
/// and every successful mutation is written back through `db`.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub graph: Arc<Mutex<GoalGraph>>,
    pub layout: Arc<Mutex<LayoutState>>,
}

impl AppState {
    pub fn load(db: Database) -> Result<Self> {
        let graph = db.load_goal_graph()?;
        tracing::info!(
            "Loaded goal graph: {} goals, {} links",
            graph.len(),
            graph.all_links().len()
        );
        Ok(Self {
            db,
            graph: Arc::new(Mutex::new(graph)),
            layout: Arc::new(Mutex::new(LayoutState::new())),
        })
    }
}

pub fn create_router(db: Database) -> Result<Router> {
    let state = AppState::load(db)?;

    let api = Router::new()
        // Goals
        .route("/goals", get(handlers::list_goals))
        .route("/goals", post(handlers::create_goal))
        .route("/goals", delete(handlers::clear_goals))
        .route("/goals/search", get(handlers::search_goals))
        .route("/goals/render", get(handlers::render_goals))
        .route("/goals/export", get(handlers::export_goals))
        .route("/goals/example", post(handlers::load_example))
        .route("/goals/links", post(handlers::create_link))
        .route("/goals/links/{source}/{target}", delete(handlers::delete_link))
        .route("/goals/{id}", get(handlers::get_goal))
        .route("/goals/{id}", put(handlers::update_goal))
        .route("/goals/{id}", delete(handlers::delete_goal))
        .route("/goals/{id}/highlight", get(handlers::highlight_goal))
        .route("/goals/{id}/info", get(handlers::goal_info))
        .route("/goals/{id}/position", put(handlers::set_goal_position))
        .route("/goals/{id}/center", get(handlers::center_on_goal))
        // Tasks
        .route("/tasks", get(handlers::list_tasks))
        .route("/tasks", post(handlers::create_task))
        .route("/tasks/undo", post(handlers::undo_delete_task))
        .route("/tasks/reset-daily", post(handlers::reset_daily_tasks))
        .route("/tasks/clear-completed", post(handlers::clear_completed_tasks))
        .route("/tasks/{id}", get(handlers::get_task))
        .route("/tasks/{id}", put(handlers::update_task))
        .route("/tasks/{id}", delete(handlers::delete_task))
        .route("/tasks/{id}/complete", post(handlers::complete_task))
        .route("/tasks/{id}/reactivate", post(handlers::reactivate_task))
        // Journal
        .route("/journal/entries", get(handlers::list_journal_entries))
        .route("/journal/entries", post(handlers::save_journal_entry))
        .route("/journal/entries/{id}", get(handlers::get_journal_entry))
        .route("/journal/entries/{id}", delete(handlers::delete_journal_entry))
        .route("/journal/entries/{id}/stats", get(handlers::journal_entry_stats))
        .route("/journal/entries/{id}/analyses", get(handlers::list_entry_analyses))
        // Analysis
        .route("/analysis", get(handlers::list_analyses))
        .route("/analysis", post(handlers::create_analysis))
        .route("/analysis/{id}", get(handlers::get_analysis))
        .route("/analysis/{id}/report", get(handlers::analysis_report))
        // System
        .route("/system/info", get(handlers::system_info))
        .route("/health", get(handlers::health));

    Ok(Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state))
}
