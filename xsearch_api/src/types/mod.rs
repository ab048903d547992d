mod meta;
pub use self::meta::{Includes, SearchMeta, SearchResponse};

mod tweet;
pub use self::tweet::{Entities, Hashtag, PublicMetrics, Tweet};

mod user;
pub use self::user::{User, UserPublicMetrics};
