//! Fan-out/fan-in for the composite news detail request.
//!
//! Both legs run concurrently inside the calling task and are joined at a
//! single point; each leg yields exactly one outcome and nothing is produced
//! after the join.

use crate::bridge::classify::{merge, FinalResponse};
use crate::bridge::command::CommandEncoder;
use crate::bridge::{Bridge, Deadline};
use crate::broker::InboundMessage;
use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;

/// One of the two concurrent round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Detail,
    Comments,
}

impl Leg {
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Detail => "detail",
            Leg::Comments => "comments",
        }
    }
}

/// What a finished leg produced.
#[derive(Debug)]
pub struct LegOutcome {
    pub leg: Leg,
    pub result: GatewayResult<InboundMessage>,
}

/// Fetch a news item and its comments concurrently and merge them.
///
/// Both legs are always awaited. One failed leg leaves its field empty; two
/// failed legs fail the request with the detail leg's error.
pub async fn news_with_comments(
    bridge: &Bridge,
    encoder: &CommandEncoder,
    news_id: &str,
    deadline: Deadline,
) -> GatewayResult<FinalResponse> {
    let detail = encoder.news_detail(news_id);
    let comments = encoder.comments_for_news(news_id);

    let (detail, comments) = tokio::join!(
        async {
            LegOutcome {
                leg: Leg::Detail,
                result: bridge.call(&detail, deadline).await,
            }
        },
        async {
            LegOutcome {
                leg: Leg::Comments,
                result: bridge.call(&comments, deadline).await,
            }
        }
    );

    combine([detail, comments])
}

/// Merge the outcomes of both legs, in leg order.
pub fn combine(outcomes: [LegOutcome; 2]) -> GatewayResult<FinalResponse> {
    let mut replies = Vec::with_capacity(outcomes.len());
    let mut first_error: Option<GatewayError> = None;

    for outcome in outcomes {
        match outcome.result {
            Ok(reply) => replies.push(reply),
            Err(e) => {
                tracing::warn!(leg = outcome.leg.as_str(), error = %e, "Composite request leg failed");
                metrics::record_leg_failure(outcome.leg.as_str(), e.kind());
                first_error.get_or_insert(e);
            }
        }
    }

    if replies.is_empty() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    merge(&replies)
}
