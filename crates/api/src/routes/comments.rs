use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use pocguide_clients::TokenClaims;
use pocguide_common::now_iso;
use pocguide_store::{clamp_reply, Comment, CommentDelete, CommentUpdate};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::global_state::GlobalState;
use crate::middleware::authenticate;
use crate::response::AppError;

pub fn comment_routes(state: &GlobalState) -> Router<GlobalState> {
    Router::new()
        // the same literal segment serves as championName on GET and as
        // commentid on PUT/DELETE
        .route("/api/comments/{id}", get(list_comments))
        .route("/api/all-comments", get(list_all_comments))
        .route("/api/comments", post(create_comment)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/comments/{id}", put(update_comment)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/comments/{id}", delete(delete_comment)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/builds/{id}/comments", get(list_build_comments))
        .route("/api/builds/{id}/comments", post(create_build_comment)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/builds/{id}/comments/{commentid}", put(update_build_comment)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/builds/{id}/comments/{commentid}", delete(delete_build_comment)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
}

/// GET /api/comments/{championName} — every comment on a champion, oldest
/// first; the client assembles the two-level thread from `parentId`.
async fn list_comments(
    State(state): State<GlobalState>,
    Path(champion_name): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let comments = state.comments.list_for_champion(&champion_name).await?;
    Ok(Json(comments))
}

async fn list_all_comments(
    State(state): State<GlobalState>,
) -> Result<Json<Value>, AppError> {
    let items = state.comments.list_all().await?;
    Ok(Json(json!({ "items": items })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateCommentRequest {
    champion_name: String,
    content: String,
    parent_id: Option<String>,
    reply_to_username: Option<String>,
}

/// POST /api/comments — replies deeper than one level are re-parented onto
/// the top-level ancestor so the stored thread never exceeds two levels.
async fn create_comment(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, anyhow!("Content required")));
    }
    if payload.champion_name.trim().is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("championName is required"),
        ));
    }

    let (parent_id, reply_to_username) = match payload.parent_id {
        Some(ref pid) => {
            let Some(parent) = state.comments.get(pid).await? else {
                return Err(AppError::new(
                    StatusCode::NOT_FOUND,
                    anyhow!("Parent comment not found"),
                ));
            };
            if parent.champion_name.as_deref() != Some(payload.champion_name.as_str()) {
                return Err(AppError::new(
                    StatusCode::BAD_REQUEST,
                    anyhow!("Parent comment belongs to a different champion"),
                ));
            }
            let (pid, reply_to) = clamp_reply(&parent, payload.reply_to_username);
            (Some(pid), reply_to)
        }
        None => (None, None),
    };

    let comment = Comment {
        commentid: Uuid::new_v4().to_string(),
        champion_name: Some(payload.champion_name),
        build_id: None,
        user_sub: user.sub.clone(),
        username: user.username.clone(),
        content: payload.content.trim().to_string(),
        created_at: now_iso(),
        updated_at: None,
        is_edited: false,
        parent_id,
        reply_to_username,
    };

    if !state.comments.insert(&comment).await? {
        return Err(AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow!("comment id collision for {}", comment.commentid),
        ));
    }

    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdateCommentRequest {
    content: String,
}

async fn update_comment(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Path(commentid): Path<String>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, anyhow!("Content required")));
    }

    match state
        .comments
        .update_content(&commentid, &user.sub, content, &now_iso())
        .await?
    {
        CommentUpdate::Updated(comment) => Ok(Json(comment)),
        CommentUpdate::NotFound => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Comment not found"),
        )),
        CommentUpdate::Forbidden => Err(AppError::new(
            StatusCode::FORBIDDEN,
            anyhow!("Unauthorized"),
        )),
    }
}

/// DELETE /api/comments/{commentid} — removing a top-level comment takes its
/// replies with it; the response reports how many went.
async fn delete_comment(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Path(commentid): Path<String>,
) -> Result<Json<Value>, AppError> {
    match state.comments.delete_with_replies(&commentid, &user.sub).await? {
        CommentDelete::Deleted { replies } => Ok(Json(json!({
            "message": "Comment deleted",
            "deletedReplies": replies,
        }))),
        CommentDelete::NotFound => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Comment not found"),
        )),
        CommentDelete::Forbidden => Err(AppError::new(
            StatusCode::FORBIDDEN,
            anyhow!("Unauthorized"),
        )),
    }
}

/// GET /api/builds/{buildId}/comments — the thread on a build detail page.
async fn list_build_comments(
    State(state): State<GlobalState>,
    Path(build_id): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let comments = state.comments.list_for_build(&build_id).await?;
    Ok(Json(comments))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateBuildCommentRequest {
    content: String,
    parent_id: Option<String>,
    reply_to_username: Option<String>,
}

/// POST /api/builds/{buildId}/comments — the build must exist; replies are
/// depth-clamped exactly like champion comments.
async fn create_build_comment(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Path(build_id): Path<String>,
    Json(payload): Json<CreateBuildCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, anyhow!("Content required")));
    }
    if state.builds.get(&build_id).await?.is_none() {
        return Err(AppError::new(StatusCode::NOT_FOUND, anyhow!("Build not found")));
    }

    let (parent_id, reply_to_username) = match payload.parent_id {
        Some(ref pid) => {
            let Some(parent) = state.comments.get(pid).await? else {
                return Err(AppError::new(
                    StatusCode::NOT_FOUND,
                    anyhow!("Parent comment not found"),
                ));
            };
            if parent.build_id.as_deref() != Some(build_id.as_str()) {
                return Err(AppError::new(
                    StatusCode::BAD_REQUEST,
                    anyhow!("Parent comment belongs to a different build"),
                ));
            }
            let (pid, reply_to) = clamp_reply(&parent, payload.reply_to_username);
            (Some(pid), reply_to)
        }
        None => (None, None),
    };

    let comment = Comment {
        commentid: Uuid::new_v4().to_string(),
        champion_name: None,
        build_id: Some(build_id),
        user_sub: user.sub.clone(),
        username: user.username.clone(),
        content: payload.content.trim().to_string(),
        created_at: now_iso(),
        updated_at: None,
        is_edited: false,
        parent_id,
        reply_to_username,
    };

    if !state.comments.insert(&comment).await? {
        return Err(AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow!("comment id collision for {}", comment.commentid),
        ));
    }

    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_build_comment(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Path((build_id, commentid)): Path<(String, String)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, anyhow!("Content required")));
    }

    comment_in_build(&state, &commentid, &build_id).await?;

    match state
        .comments
        .update_content(&commentid, &user.sub, content, &now_iso())
        .await?
    {
        CommentUpdate::Updated(comment) => Ok(Json(comment)),
        CommentUpdate::NotFound => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Comment not found"),
        )),
        CommentUpdate::Forbidden => Err(AppError::new(
            StatusCode::FORBIDDEN,
            anyhow!("Unauthorized"),
        )),
    }
}

async fn delete_build_comment(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Path((build_id, commentid)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    comment_in_build(&state, &commentid, &build_id).await?;

    match state.comments.delete_with_replies(&commentid, &user.sub).await? {
        CommentDelete::Deleted { replies } => Ok(Json(json!({
            "message": "Comment deleted",
            "deletedReplies": replies,
        }))),
        CommentDelete::NotFound => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Comment not found"),
        )),
        CommentDelete::Forbidden => Err(AppError::new(
            StatusCode::FORBIDDEN,
            anyhow!("Unauthorized"),
        )),
    }
}

/// A comment addressed through a build path must actually belong to that
/// build; ownership itself is still enforced by the conditional write.
async fn comment_in_build(
    state: &GlobalState,
    commentid: &str,
    build_id: &str,
) -> Result<(), AppError> {
    match state.comments.get(commentid).await? {
        Some(comment) if comment.build_id.as_deref() == Some(build_id) => Ok(()),
        _ => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Comment not found"),
        )),
    }
}
