//! HTTP transport for the admission review endpoint
//!
//! Decodes the review envelope, dispatches into a [`Reviewer`], and encodes
//! the response back into the envelope. Malformed and empty bodies are
//! rejected here with HTTP 400; the reviewer is never invoked with invalid
//! input. The router is generic over any `Reviewer`, so this module carries
//! no dependency on merge/diff internals.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;

use crate::admission::{AdmissionReview, Reviewer};
use crate::{Error, Result};

/// Create the webhook router with the admission review endpoint
///
/// Currently supports:
/// - POST /webhook - Review and mutate pod admission requests
pub fn webhook_router<R>(reviewer: Arc<R>) -> Router
where
    R: Reviewer + 'static,
{
    Router::new()
        .route("/webhook", post(review_handler::<R>))
        .with_state(reviewer)
}

/// Handle `POST /webhook` - decode the envelope, review, encode the response
async fn review_handler<R>(State(reviewer): State<Arc<R>>, body: Bytes) -> Response
where
    R: Reviewer + 'static,
{
    let mut review = match decode_review(&body) {
        Ok(review) => review,
        Err(Error::InvalidRequest(message)) => {
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let Some(request) = review.request.take() else {
        return (
            StatusCode::BAD_REQUEST,
            "admission review must contain a request".to_string(),
        )
            .into_response();
    };

    review.response = Some(reviewer.review(&request));
    Json(review).into_response()
}

/// Decode the review envelope, rejecting empty and malformed bodies
fn decode_review(body: &[u8]) -> Result<AdmissionReview> {
    if body.is_empty() {
        return Err(Error::invalid_request("cannot parse empty request body"));
    }
    serde_json::from_slice(body).map_err(|e| {
        Error::invalid_request(format!("cannot decode request body as admission review: {e}"))
    })
}
