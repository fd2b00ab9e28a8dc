//! Task resource routes.
//!
//! Handlers are thin adapters: id-format check, payload validation (pure
//! functions in `crate::tasks`), one storage call, error translation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::rest::error::ApiError;
use crate::tasks::{self, Task, TaskStats};
use crate::AppContext;

/// Request body shared by create (POST) and update (PUT). Every field is
/// optional at the wire level; the validators decide what is required per
/// operation.
#[derive(Debug, Deserialize)]
pub struct TaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// Reject malformed ids before any storage lookup.
fn check_id(id: &str) -> Result<(), ApiError> {
    if tasks::is_valid_task_id(id) {
        Ok(())
    } else {
        Err(ApiError::InvalidId)
    }
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let rows = ctx
        .storage
        .list_tasks()
        .await
        .map_err(ApiError::store("fetching tasks"))?;
    Ok(Json(rows.into_iter().map(Task::from).collect()))
}

pub async fn task_stats(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<TaskStats>, ApiError> {
    let stats = ctx
        .storage
        .task_stats()
        .await
        .map_err(ApiError::store("fetching statistics"))?;
    Ok(Json(stats))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    check_id(&id)?;
    let row = ctx
        .storage
        .get_task(&id)
        .await
        .map_err(ApiError::store("fetching task"))?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<TaskPayload>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let new_task = tasks::validate_create(
        body.title.as_deref(),
        body.description.as_deref(),
        body.completed,
    )?;
    let row = ctx
        .storage
        .create_task(&new_task)
        .await
        .map_err(ApiError::store("creating task"))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(body): Json<TaskPayload>,
) -> Result<Json<Task>, ApiError> {
    check_id(&id)?;
    let patch = tasks::validate_update(
        body.title.as_deref(),
        body.description.as_deref(),
        body.completed,
    )?;
    let row = ctx
        .storage
        .update_task(&id, &patch)
        .await
        .map_err(ApiError::store("updating task"))?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

pub async fn toggle_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    check_id(&id)?;
    let row = ctx
        .storage
        .toggle_task(&id)
        .await
        .map_err(ApiError::store("toggling task status"))?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    check_id(&id)?;
    let deleted = ctx
        .storage
        .delete_task(&id)
        .await
        .map_err(ApiError::store("deleting task"))?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    Ok(Json(json!({
        "success": true,
        "message": "Task deleted successfully",
    })))
}
