mod handler;
pub mod model;

pub use handler::{CACHE_STATUS_HEADER, summarize_text, summarize_url};
