//! Endpoint adapters.
//!
//! Each handler extracts its query, encodes a command, runs it through the
//! bridge and renders the outcome. Parameter errors are returned before
//! anything is published.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::bridge::aggregate::news_with_comments;
use crate::bridge::command::{
    require, AddCommentQuery, CommentsQuery, DateQuery, DetailQuery, FilterQuery, ListQuery,
};
use crate::bridge::Command;
use crate::error::{GatewayError, GatewayResult};
use crate::http::request::RequestId;
use crate::http::response::passthrough;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Banner served on `/`.
pub const BANNER: &str = "GoNews Server";

pub async fn root() -> &'static str {
    BANNER
}

/// Run one command and pass its reply through with `success`.
async fn forward(
    state: &AppState,
    endpoint: &'static str,
    request_id: &RequestId,
    command: GatewayResult<Command>,
    success: StatusCode,
) -> Response {
    let start = Instant::now();

    let result = match command {
        Ok(command) => {
            tracing::debug!(
                request_id = %request_id,
                endpoint,
                command = %command.body,
                "Forwarding command"
            );
            state
                .bridge
                .call(&command, state.bridge.deadline())
                .await
                .map(|reply| passthrough(success, reply.payload))
        }
        Err(e) => Err(e),
    };

    finish(endpoint, request_id, start, result)
}

fn finish(
    endpoint: &'static str,
    request_id: &RequestId,
    start: Instant,
    result: GatewayResult<Response>,
) -> Response {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            log_failure(endpoint, request_id, &e);
            e.into_response()
        }
    };
    metrics::record_request(endpoint, response.status().as_u16(), start);
    response
}

fn log_failure(endpoint: &'static str, request_id: &RequestId, error: &GatewayError) {
    match error {
        GatewayError::InvalidParameter(_) => {
            tracing::warn!(request_id = %request_id, endpoint, error = %error, "Rejected request")
        }
        _ => tracing::error!(
            request_id = %request_id,
            endpoint,
            kind = error.kind(),
            error = %error,
            "Request failed"
        ),
    }
}

/// `GET /newslist/?page&n`
pub async fn news_list(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(query): Query<ListQuery>,
) -> Response {
    let command = Ok(state.encoder.news_list(&query));
    forward(&state, "news_list", &request_id, command, StatusCode::OK).await
}

/// `GET /newslist/filtered/?category&author&date&tags&limit`
pub async fn filtered_list(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(query): Query<FilterQuery>,
) -> Response {
    let command = Ok(state.encoder.filtered_list(&query));
    forward(&state, "filtered_list", &request_id, command, StatusCode::OK).await
}

/// `GET /newslist/filtered/date?date`
pub async fn filter_by_date(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(query): Query<DateQuery>,
) -> Response {
    let command = state.encoder.filter_by_date(&query);
    forward(&state, "filter_by_date", &request_id, command, StatusCode::OK).await
}

/// `GET /newsdetail?id`, answered with news body and comments merged.
pub async fn news_detail(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(query): Query<DetailQuery>,
) -> Response {
    let start = Instant::now();

    let result = match require(&query.id, "id") {
        Ok(id) => {
            tracing::debug!(request_id = %request_id, news_id = %id, "Fetching news with comments");
            news_with_comments(&state.bridge, &state.encoder, id, state.bridge.deadline())
                .await
                .map(|merged| Json(merged).into_response())
        }
        Err(e) => Err(e),
    };

    finish("news_detail", &request_id, start, result)
}

/// `GET /comments/?newsID`
pub async fn comments_by_news(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(query): Query<CommentsQuery>,
) -> Response {
    let command = state.encoder.comments_by_news(&query);
    forward(&state, "comments_by_news", &request_id, command, StatusCode::OK).await
}

/// `POST /addcomment/?comment`
pub async fn add_comment(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(query): Query<AddCommentQuery>,
) -> Response {
    let command = state.encoder.add_comment(&query);
    forward(&state, "add_comment", &request_id, command, StatusCode::CREATED).await
}
