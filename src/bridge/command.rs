//! Command encoding.
//!
//! Turns HTTP query parameters into the flat command strings the backend
//! services understand, together with the topic each command is published to
//! and the channel its reply comes back on.

use serde::Deserialize;

use crate::config::schema::{NewsConfig, TopicConfig};
use crate::error::{GatewayError, GatewayResult};

/// Inbound channel a reply is expected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyRoute {
    NewsList,
    FilteredContent,
    FilterPublished,
    NewsDetail,
    Comments,
}

impl ReplyRoute {
    pub const ALL: [ReplyRoute; 5] = [
        ReplyRoute::NewsList,
        ReplyRoute::FilteredContent,
        ReplyRoute::FilterPublished,
        ReplyRoute::NewsDetail,
        ReplyRoute::Comments,
    ];

    /// Topic this route consumes from.
    pub fn topic<'a>(&self, topics: &'a TopicConfig) -> &'a str {
        match self {
            ReplyRoute::NewsList => &topics.news_list,
            ReplyRoute::FilteredContent => &topics.filtered_content,
            ReplyRoute::FilterPublished => &topics.filter_published,
            ReplyRoute::NewsDetail => &topics.news_detail,
            ReplyRoute::Comments => &topics.comments,
        }
    }
}

/// One backend operation, ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub topic: String,
    pub body: String,
    pub reply: ReplyRoute,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub n: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub category: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub tags: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentsQuery {
    #[serde(rename = "newsID")]
    pub news_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddCommentQuery {
    pub comment: Option<String>,
}

/// Returns the value if present and non-empty.
pub fn require<'a>(value: &'a Option<String>, name: &'static str) -> GatewayResult<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(GatewayError::InvalidParameter(name)),
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Parse a paging number, tolerating garbage.
fn number_or_default(raw: Option<&str>, default: u32, name: &'static str) -> u32 {
    match raw {
        None => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::warn!(parameter = name, value = %s, default, "Invalid paging parameter, using default");
            default
        }),
    }
}

/// Builds commands for every endpoint kind.
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    topics: TopicConfig,
    defaults: NewsConfig,
}

impl CommandEncoder {
    pub fn new(topics: TopicConfig, defaults: NewsConfig) -> Self {
        Self { topics, defaults }
    }

    fn command(&self, topic: &str, body: String, reply: ReplyRoute) -> Command {
        Command {
            topic: topic.to_string(),
            body,
            reply,
        }
    }

    /// `/newslist/?n=<limit>&page=<page>`
    pub fn news_list(&self, query: &ListQuery) -> Command {
        let page = number_or_default(present(&query.page), self.defaults.default_page, "page");
        let limit = number_or_default(present(&query.n), self.defaults.default_limit, "n");
        self.command(
            &self.topics.news_input,
            format!("/newslist/?n={limit}&page={page}"),
            ReplyRoute::NewsList,
        )
    }

    /// `newslist/filtered?category=..&author=..&date=..&tags=..&limit=..`
    ///
    /// Only present filters are included; limit is always present.
    pub fn filtered_list(&self, query: &FilterQuery) -> Command {
        let mut params = Vec::with_capacity(5);
        let filters = [
            ("category", &query.category),
            ("author", &query.author),
            ("date", &query.date),
            ("tags", &query.tags),
        ];
        for (name, value) in filters {
            if let Some(v) = present(value) {
                params.push(format!("{name}={v}"));
            }
        }
        match present(&query.limit) {
            Some(limit) => params.push(format!("limit={limit}")),
            None => params.push(format!("limit={}", self.defaults.default_limit)),
        }

        self.command(
            &self.topics.news_input,
            format!("newslist/filtered?{}", params.join("&")),
            ReplyRoute::FilteredContent,
        )
    }

    /// `newslist/filtered/?date=<date>`
    pub fn filter_by_date(&self, query: &DateQuery) -> GatewayResult<Command> {
        let date = require(&query.date, "date")?;
        Ok(self.command(
            &self.topics.news_input,
            format!("newslist/filtered/?date={date}"),
            ReplyRoute::FilterPublished,
        ))
    }

    /// Detail leg of the composite request: `/newsdetail/<id>`.
    pub fn news_detail(&self, id: &str) -> Command {
        self.command(
            &self.topics.news_input,
            format!("/newsdetail/{id}"),
            ReplyRoute::NewsDetail,
        )
    }

    /// Comments leg of the composite request: `/comments/<id>`.
    pub fn comments_for_news(&self, id: &str) -> Command {
        self.command(
            &self.topics.comments_input,
            format!("/comments/{id}"),
            ReplyRoute::Comments,
        )
    }

    /// `/comments/?newsID=<id>`
    pub fn comments_by_news(&self, query: &CommentsQuery) -> GatewayResult<Command> {
        let news_id = require(&query.news_id, "newsID")?;
        Ok(self.command(
            &self.topics.comments_input,
            format!("/comments/?newsID={news_id}"),
            ReplyRoute::Comments,
        ))
    }

    /// `/add_comments/?comment=<comment>`
    pub fn add_comment(&self, query: &AddCommentQuery) -> GatewayResult<Command> {
        let comment = require(&query.comment, "comment")?;
        Ok(self.command(
            &self.topics.add_comments,
            format!("/add_comments/?comment={comment}"),
            ReplyRoute::Comments,
        ))
    }
}
