//! Reply classification and merging for the composite detail response.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::broker::{InboundMessage, KIND_HEADER};
use crate::error::{GatewayError, GatewayResult};

/// Substring that marks an untagged reply as news content.
pub const NEWS_MARKER: &str = "Title";

/// Substring that marks an untagged reply as comment content.
pub const COMMENTS_MARKER: &str = "comment";

/// The merged body of `/newsdetail`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub news: String,
    pub comments: String,
}

/// Field of [`FinalResponse`] a reply belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    News,
    Comments,
}

impl FromStr for ReplyKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" => Ok(ReplyKind::News),
            "comments" | "comment" => Ok(ReplyKind::Comments),
            _ => Err(()),
        }
    }
}

/// Kinds a payload belongs to, decided by the `kind` header when the backend
/// set one and by marker substrings otherwise.
pub fn classify(reply: &InboundMessage, text: &str) -> Vec<ReplyKind> {
    if let Some(kind) = reply.header(KIND_HEADER).and_then(|k| k.parse().ok()) {
        return vec![kind];
    }

    let mut kinds = Vec::with_capacity(2);
    if text.contains(NEWS_MARKER) {
        kinds.push(ReplyKind::News);
    }
    if text.contains(COMMENTS_MARKER) {
        kinds.push(ReplyKind::Comments);
    }
    kinds
}

/// Merge replies into one response, in order; later replies overwrite
/// earlier ones for the same field.
pub fn merge<'a, I>(replies: I) -> GatewayResult<FinalResponse>
where
    I: IntoIterator<Item = &'a InboundMessage>,
{
    let mut merged = FinalResponse::default();

    for reply in replies {
        let text = std::str::from_utf8(&reply.payload)
            .map_err(|e| GatewayError::Classification(format!("reply is not UTF-8 text: {e}")))?;

        let kinds = classify(reply, text);
        if kinds.is_empty() {
            tracing::debug!(bytes = reply.payload.len(), "Reply matches no field, dropped");
        }
        for kind in kinds {
            match kind {
                ReplyKind::News => merged.news = text.to_string(),
                ReplyKind::Comments => merged.comments = text.to_string(),
            }
        }
    }

    Ok(merged)
}
