use std::sync::Arc;

use fetch::PageFetcher;
use middleware::RequestGate;
use service::SummaryService;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod fetch;
pub mod middleware;
pub mod plan;
pub mod quota;
pub mod result;
pub mod router;
pub mod routes;
pub mod service;
pub mod summarizer;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<RequestGate>,
    pub summaries: Arc<SummaryService>,
    pub pages: Arc<dyn PageFetcher>,
}
