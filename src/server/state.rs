use axum::extract::FromRef;

use crate::insights::InsightsService;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedInsightsService = Arc<InsightsService>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub insights: GuardedInsightsService,
}

impl ServerState {
    pub fn new(config: ServerConfig, insights: GuardedInsightsService) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            insights,
        }
    }
}

impl FromRef<ServerState> for GuardedInsightsService {
    fn from_ref(input: &ServerState) -> Self {
        input.insights.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
