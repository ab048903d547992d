use std::fmt;

use url::Url;

use super::common::{Query, QueryCommon};

/// Post fields that can be requested through `tweet.fields`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweetField {
    CreatedAt,
    PublicMetrics,
    AuthorId,
    Lang,
    Entities,
    ConversationId,
}

impl fmt::Display for TweetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TweetField::CreatedAt => "created_at",
            TweetField::PublicMetrics => "public_metrics",
            TweetField::AuthorId => "author_id",
            TweetField::Lang => "lang",
            TweetField::Entities => "entities",
            TweetField::ConversationId => "conversation_id",
        };
        write!(f, "{}", value)
    }
}

/// User fields that can be requested through `user.fields`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserField {
    Username,
    Name,
    Verified,
    PublicMetrics,
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            UserField::Username => "username",
            UserField::Name => "name",
            UserField::Verified => "verified",
            UserField::PublicMetrics => "public_metrics",
        };
        write!(f, "{}", value)
    }
}

/// Related objects to expand into `includes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expansion {
    AuthorId,
    AttachmentsMediaKeys,
}

impl fmt::Display for Expansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Expansion::AuthorId => "author_id",
            Expansion::AttachmentsMediaKeys => "attachments.media_keys",
        };
        write!(f, "{}", value)
    }
}

/// Query builder for `GET /2/tweets/search/recent`.
///
/// The query text uses the platform's operator grammar (`-is:retweet`,
/// `lang:en`, `OR` groups) and is passed through untouched.
#[derive(Clone, Debug)]
pub struct SearchQuery {
    pub common: QueryCommon,
    pub query: String,
    pub tweet_fields: Vec<TweetField>,
    pub user_fields: Vec<UserField>,
    pub expansions: Vec<Expansion>,
}

impl SearchQuery {
    /// Creates a query requesting creation time, metrics, language, entities,
    /// and the expanded author.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            common: QueryCommon::default(),
            query: query.into(),
            tweet_fields: vec![
                TweetField::CreatedAt,
                TweetField::PublicMetrics,
                TweetField::AuthorId,
                TweetField::Lang,
                TweetField::Entities,
            ],
            user_fields: vec![
                UserField::Username,
                UserField::Name,
                UserField::Verified,
                UserField::PublicMetrics,
            ],
            expansions: vec![Expansion::AuthorId],
        }
    }

    pub fn with_tweet_field(mut self, field: TweetField) -> Self {
        if !self.tweet_fields.contains(&field) {
            self.tweet_fields.push(field);
        }
        self
    }

    pub fn with_user_field(mut self, field: UserField) -> Self {
        if !self.user_fields.contains(&field) {
            self.user_fields.push(field);
        }
        self
    }

    pub fn with_expansion(mut self, expansion: Expansion) -> Self {
        if !self.expansions.contains(&expansion) {
            self.expansions.push(expansion);
        }
        self
    }
}

impl Query for SearchQuery {
    fn get_common(&mut self) -> &mut QueryCommon {
        &mut self.common
    }

    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut().append_pair("query", &self.query);
        let mut url = self.common.add_to_url(&url);
        if !self.tweet_fields.is_empty() {
            url.query_pairs_mut()
                .append_pair("tweet.fields", &join(&self.tweet_fields));
        }
        if !self.user_fields.is_empty() {
            url.query_pairs_mut()
                .append_pair("user.fields", &join(&self.user_fields));
        }
        if !self.expansions.is_empty() {
            url.query_pairs_mut()
                .append_pair("expansions", &join(&self.expansions));
        }
        url
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
