use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{repo::User, session::SessionUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::dto::{CreateTodoRequest, TodoResponse, UpdateTodoRequest};
use super::repo;

pub fn todo_routes() -> Router<AppState> {
    Router::new().route("/todos", get(list_todos).post(create_todo).patch(update_todo))
}

/// The session vouches for who the caller is, but every todo operation is
/// keyed on the user row as it exists right now. A deleted account gets a 404
/// even while its token is still live.
async fn owner(state: &AppState, session: &SessionUser) -> ApiResult<User> {
    User::find_by_email(&state.db, &session.email)
        .await?
        .ok_or_else(ApiError::user_not_found)
}

#[instrument(skip(state, session))]
async fn list_todos(
    State(state): State<AppState>,
    session: SessionUser,
) -> ApiResult<Json<Vec<TodoResponse>>> {
    let user = owner(&state, &session).await?;
    let todos = repo::list_by_owner(&state.db, user.id).await?;
    Ok(Json(todos.into_iter().map(TodoResponse::from).collect()))
}

#[instrument(skip(state, session, payload))]
async fn create_todo(
    State(state): State<AppState>,
    session: SessionUser,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TodoResponse>)> {
    let Ok(Json(payload)) = payload else {
        return Err(ApiError::bad_request("Invalid JSON"));
    };
    let Some(title) = payload.clean_title() else {
        return Err(ApiError::bad_request("Title is required"));
    };

    let user = owner(&state, &session).await?;
    let todo = repo::insert(&state.db, user.id, title, payload.clean_description()).await?;

    info!(user_id = %user.id, todo_id = %todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo.into())))
}

#[instrument(skip(state, session, payload))]
async fn update_todo(
    State(state): State<AppState>,
    session: SessionUser,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> ApiResult<Json<TodoResponse>> {
    let Ok(Json(payload)) = payload else {
        return Err(ApiError::bad_request("Invalid JSON"));
    };
    let Some(id) = payload.id else {
        return Err(ApiError::bad_request("Todo ID is required"));
    };
    let Some(done) = payload.done_flag() else {
        return Err(ApiError::bad_request("Done status must be a boolean"));
    };

    let user = owner(&state, &session).await?;
    let todo = repo::set_done(&state.db, user.id, id, done)
        .await?
        .ok_or_else(ApiError::todo_not_found)?;

    info!(user_id = %user.id, todo_id = %todo.id, done, "todo updated");
    Ok(Json(todo.into()))
}
