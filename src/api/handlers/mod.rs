use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::analysis::{analyze_content, format_report, ContentStats};
use crate::export::DEFAULT_EXPORT_FILE;
use crate::graph::{GoalGraph, GraphError, GraphPresenter, Highlight, NodeInfo, Position, RenderModel};
use crate::models::*;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
///
/// Storage-level validation failures ("... must not be empty") are safe to
/// expose and come back as BAD_REQUEST. A missing referenced record
/// ("... not found: id") comes back as NOT_FOUND.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.contains("must not be empty") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }
    if msg.contains("not found: ") {
        tracing::warn!("Missing reference: {}", msg);
        return (StatusCode::NOT_FOUND, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn graph_error(e: GraphError) -> (StatusCode, String) {
    let status = match e {
        GraphError::DuplicateId(_) | GraphError::DuplicateLink { .. } => StatusCode::CONFLICT,
        GraphError::NotFound(_) | GraphError::LinkNotFound { .. } => StatusCode::NOT_FOUND,
        GraphError::MissingEndpoint { .. } | GraphError::InvalidInput(_) => StatusCode::BAD_REQUEST,
    };
    tracing::debug!("Rejected graph operation: {}", e);
    (status, e.to_string())
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

fn lock_graph(state: &AppState) -> std::sync::MutexGuard<'_, GoalGraph> {
    state.graph.lock().expect("goal graph lock poisoned")
}

/// Write the graph back to storage after a successful mutation.
fn persist(state: &AppState, graph: &GoalGraph) -> ApiResult<()> {
    state.db.save_graph(graph).map_err(internal_error)?;
    state
        .layout
        .lock()
        .expect("layout lock poisoned")
        .retain(graph);
    Ok(())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Goals
// ============================================================

pub async fn list_goals(State(state): State<AppState>) -> Json<GraphSnapshot> {
    Json(lock_graph(&state).snapshot())
}

pub async fn get_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<GoalNode>> {
    lock_graph(&state)
        .get_node(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("Goal"))
}

pub async fn create_goal(
    State(state): State<AppState>,
    Json(input): Json<CreateGoalInput>,
) -> ApiResult<(StatusCode, Json<GoalNode>)> {
    let mut graph = lock_graph(&state);
    let id = input.id.trim();
    let parent = input.parent.as_deref().map(str::trim).filter(|p| !p.is_empty());

    // Checked up front so a bad parent leaves no orphan behind.
    if let Some(parent) = parent {
        if !graph.contains(parent) {
            return Err(graph_error(GraphError::MissingEndpoint {
                from: parent.to_string(),
                to: id.to_string(),
            }));
        }
    }

    graph
        .try_add_node(id, input.description.trim(), input.category.unwrap_or_default())
        .map_err(graph_error)?;

    if let Some(parent) = parent {
        graph.try_add_link(parent, id).map_err(graph_error)?;
    }

    persist(&state, &graph)?;
    tracing::info!("Created goal {}", id);

    let node = graph.get_node(id).cloned().ok_or_else(|| not_found("Goal"))?;
    Ok((StatusCode::CREATED, Json(node)))
}

pub async fn update_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateGoalInput>,
) -> ApiResult<Json<GoalNode>> {
    let mut graph = lock_graph(&state);
    let existing = graph.get_node(&id).cloned().ok_or_else(|| not_found("Goal"))?;

    let description = input
        .description
        .map(|d| d.trim().to_string())
        .unwrap_or(existing.description);
    let category = input.category.unwrap_or(existing.category);

    graph
        .try_update_node(&id, &description, category)
        .map_err(graph_error)?;
    persist(&state, &graph)?;

    let node = graph.get_node(&id).cloned().ok_or_else(|| not_found("Goal"))?;
    Ok(Json(node))
}

#[derive(Debug, Deserialize)]
pub struct DeleteGoalQuery {
    #[serde(default)]
    pub cascade: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteGoalResponse {
    pub removed_goals: Vec<String>,
    pub removed_tasks: usize,
}

/// Remove a goal, or with `?cascade=true` the goal and everything reachable
/// below it. Tasks linked to any removed goal are deleted as well.
pub async fn delete_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteGoalQuery>,
) -> ApiResult<Json<DeleteGoalResponse>> {
    let mut graph = lock_graph(&state);
    if !graph.contains(&id) {
        return Err(not_found("Goal"));
    }

    let doomed = if query.cascade {
        graph.subtree_preorder(&id)
    } else {
        vec![id.clone()]
    };

    let mut removed_goals = Vec::with_capacity(doomed.len());
    for goal_id in doomed {
        if graph.remove_node(&goal_id) {
            removed_goals.push(goal_id);
        }
    }
    persist(&state, &graph)?;

    let mut removed_tasks = 0;
    for goal_id in &removed_goals {
        removed_tasks += state
            .db
            .delete_tasks_for_goal(goal_id)
            .map_err(internal_error)?;
    }

    tracing::info!(
        "Removed {} goal(s) and {} task(s) starting at {}",
        removed_goals.len(),
        removed_tasks,
        id
    );
    Ok(Json(DeleteGoalResponse {
        removed_goals,
        removed_tasks,
    }))
}

pub async fn create_link(
    State(state): State<AppState>,
    Json(input): Json<CreateLinkInput>,
) -> ApiResult<(StatusCode, Json<GoalLink>)> {
    let mut graph = lock_graph(&state);
    graph
        .try_add_link(&input.source, &input.target)
        .map_err(graph_error)?;
    persist(&state, &graph)?;

    Ok((
        StatusCode::CREATED,
        Json(GoalLink::new(input.source, input.target)),
    ))
}

pub async fn delete_link(
    State(state): State<AppState>,
    Path((source, target)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let mut graph = lock_graph(&state);
    graph
        .try_remove_link(&source, &target)
        .map_err(graph_error)?;
    persist(&state, &graph)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search-as-you-type: goals matching `q` in creation order. A blank query matches nothing.
pub async fn search_goals(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<GoalNode>> {
    let graph = lock_graph(&state);
    let hits = GraphPresenter::new(&graph).search(&query.q);
    Json(
        graph
            .all_nodes()
            .into_iter()
            .filter(|n| hits.contains(&n.id))
            .cloned()
            .collect(),
    )
}

pub async fn highlight_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Highlight>> {
    let graph = lock_graph(&state);
    if !graph.contains(&id) {
        return Err(not_found("Goal"));
    }
    Ok(Json(GraphPresenter::new(&graph).highlight_connections(&id)))
}

pub async fn goal_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<NodeInfo>> {
    let graph = lock_graph(&state);
    GraphPresenter::new(&graph)
        .node_info(&id)
        .map(Json)
        .ok_or_else(|| not_found("Goal"))
}

#[derive(Debug, Deserialize)]
pub struct RenderQuery {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// With a viewport size, goals that have no position yet are seeded around its center.
pub async fn render_goals(
    State(state): State<AppState>,
    Query(query): Query<RenderQuery>,
) -> Json<RenderModel> {
    let graph = lock_graph(&state);
    let mut layout = state.layout.lock().expect("layout lock poisoned");
    if let (Some(width), Some(height)) = (query.width, query.height) {
        layout.seed(&graph, width, height);
    }
    Json(GraphPresenter::new(&graph).with_layout(&layout).render_model())
}

pub async fn set_goal_position(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(position): Json<Position>,
) -> ApiResult<StatusCode> {
    if !lock_graph(&state).contains(&id) {
        return Err(not_found("Goal"));
    }
    state
        .layout
        .lock()
        .expect("layout lock poisoned")
        .set_position(&id, position.x, position.y);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ViewportQuery {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// Translation that brings a goal to the middle of a `width` x `height` viewport.
pub async fn center_on_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(viewport): Query<ViewportQuery>,
) -> ApiResult<Json<Position>> {
    let layout = state.layout.lock().expect("layout lock poisoned");
    layout
        .center_on(&id, viewport.width, viewport.height, viewport.scale)
        .map(|(x, y)| Json(Position { x, y }))
        .ok_or_else(|| not_found("Goal position"))
}

pub async fn export_goals(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = lock_graph(&state).snapshot();
    (
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", DEFAULT_EXPORT_FILE),
        )],
        Json(snapshot),
    )
}

/// Replace the current graph with the built-in example.
pub async fn load_example(State(state): State<AppState>) -> ApiResult<Json<GraphSnapshot>> {
    let mut graph = lock_graph(&state);
    *graph = GoalGraph::example();
    persist(&state, &graph)?;
    tracing::info!("Loaded example graph");
    Ok(Json(graph.snapshot()))
}

pub async fn clear_goals(State(state): State<AppState>) -> ApiResult<StatusCode> {
    let mut graph = lock_graph(&state);
    graph.clear();
    persist(&state, &graph)?;
    tracing::info!("Cleared goal graph");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Tasks
// ============================================================

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<TaskLists>> {
    state.db.get_task_lists().map(Json).map_err(internal_error)
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    state
        .db
        .get_task(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Task"))
}

fn check_goal_exists(state: &AppState, goal_id: Option<&str>) -> ApiResult<()> {
    match goal_id.filter(|g| !g.is_empty()) {
        Some(goal_id) if !lock_graph(state).contains(goal_id) => Err((
            StatusCode::BAD_REQUEST,
            format!("Goal \"{}\" not found", goal_id),
        )),
        _ => Ok(()),
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(input): Json<CreateTaskInput>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    check_goal_exists(&state, input.goal_id.as_deref())?;
    state
        .db
        .create_task(input)
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(internal_error)
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTaskInput>,
) -> ApiResult<Json<Task>> {
    check_goal_exists(&state, input.goal_id.as_deref())?;
    state
        .db
        .update_task(&id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Task"))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    match state.db.delete_task(&id) {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(not_found("Task")),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    state
        .db
        .complete_task(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Active task"))
}

pub async fn reactivate_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    state
        .db
        .reactivate_task(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Completed task"))
}

pub async fn undo_delete_task(State(state): State<AppState>) -> ApiResult<Json<Task>> {
    state
        .db
        .undo_delete_task()
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Nothing to undo".to_string()))
}

pub async fn reset_daily_tasks(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let today = chrono::Utc::now().date_naive();
    let reset = state.db.reset_daily_tasks(today).map_err(internal_error)?;
    Ok(Json(serde_json::json!({ "reset": reset })))
}

pub async fn clear_completed_tasks(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let removed = state.db.clear_completed_tasks().map_err(internal_error)?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

// ============================================================
// Journal
// ============================================================

/// `?type=` narrows to one entry type (`all` for any), `?q=` searches content.
pub async fn list_journal_entries(
    State(state): State<AppState>,
    Query(filter): Query<JournalFilter>,
) -> ApiResult<Json<Vec<JournalEntry>>> {
    state
        .db
        .get_journal_entries(&filter)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_journal_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JournalEntry>> {
    state
        .db
        .get_journal_entry(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Journal entry"))
}

pub async fn save_journal_entry(
    State(state): State<AppState>,
    Json(input): Json<SaveJournalEntryInput>,
) -> ApiResult<Json<JournalEntry>> {
    state
        .db
        .save_journal_entry(input)
        .map(Json)
        .map_err(internal_error)
}

pub async fn journal_entry_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContentStats>> {
    let entry = state
        .db
        .get_journal_entry(&id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Journal entry"))?;
    Ok(Json(analyze_content(&entry.content)))
}

pub async fn list_entry_analyses(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<AnalysisEntry>>> {
    if state.db.get_journal_entry(&id).map_err(internal_error)?.is_none() {
        return Err(not_found("Journal entry"));
    }
    state
        .db
        .get_analyses_for_entry(&id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn delete_journal_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    match state.db.delete_journal_entry(&id) {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(not_found("Journal entry")),
        Err(e) => Err(internal_error(e)),
    }
}

// ============================================================
// Analysis
// ============================================================

pub async fn list_analyses(State(state): State<AppState>) -> ApiResult<Json<Vec<AnalysisEntry>>> {
    state.db.get_analyses().map(Json).map_err(internal_error)
}

pub async fn create_analysis(
    State(state): State<AppState>,
    Json(input): Json<CreateAnalysisInput>,
) -> ApiResult<(StatusCode, Json<AnalysisEntry>)> {
    state
        .db
        .create_analysis(input)
        .map(|a| (StatusCode::CREATED, Json(a)))
        .map_err(internal_error)
}

pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AnalysisEntry>> {
    state
        .db
        .get_analysis(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Analysis"))
}

/// The analysis as a plain-text report, offered as a download.
pub async fn analysis_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let analysis = state
        .db
        .get_analysis(&id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Analysis"))?;
    let entry = match analysis.entry_id.as_deref() {
        Some(entry_id) => state.db.get_journal_entry(entry_id).map_err(internal_error)?,
        None => None,
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"analysis-{}.txt\"", analysis.id),
            ),
        ],
        format_report(&analysis, entry.as_ref()),
    ))
}

// ============================================================
// System
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemInfo {
    /// `None` for in-memory databases.
    pub database_path: Option<String>,
    pub database_size_bytes: u64,
    pub goal_count: usize,
    pub link_count: usize,
}

pub async fn system_info(State(state): State<AppState>) -> Json<SystemInfo> {
    let (goal_count, link_count) = {
        let graph = lock_graph(&state);
        (graph.len(), graph.all_links().len())
    };
    let path = state.db.path();
    let database_size_bytes = path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Json(SystemInfo {
        database_path: path.map(|p| p.display().to_string()),
        database_size_bytes,
        goal_count,
        link_count,
    })
}
