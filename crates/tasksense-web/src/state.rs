//! Application state.

use std::sync::Arc;
use tasksense_core::{
    AiConfig, AiResult, EstimationService, ParserService, RepositoryFactory, SummaryService,
    TaskRepository,
};
use tasksense_db::DbPool;

/// Services shared by every handler and session. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AiConfig>,
    pub tasks: Arc<dyn TaskRepository>,
    pub estimation: Arc<EstimationService>,
    pub summaries: Arc<SummaryService>,
    pub parser: Arc<ParserService>,
}

impl AppState {
    pub fn new(db: DbPool, config: AiConfig) -> AiResult<Self> {
        let repositories = RepositoryFactory::new(db);

        Ok(Self {
            tasks: repositories.task_repository(),
            estimation: Arc::new(EstimationService::from_config(&config, &repositories)?),
            summaries: Arc::new(SummaryService::from_config(&config, &repositories)?),
            parser: Arc::new(ParserService::from_config(&config, &repositories)?),
            config: Arc::new(config),
        })
    }
}
