//! Feed transport and parsing. Thin collaborators around the enrichment
//! pipeline: fetch bytes, map feed entries to articles, nothing more.

mod fetcher;
mod parser;
mod util;

pub use self::fetcher::fetch_articles;
pub use self::parser::parse_feed;
pub use self::util::is_valid_url;
