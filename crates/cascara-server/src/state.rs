use cascara_client::{CssFieldExtractor, FetcherRegistry};
use cascara_core::orchestrator::JobOrchestrator;
use cascara_db::{Database, JobRepository, ResultRepository, RuleRepository, UrlRepository};

/// The orchestrator wired to the PostgreSQL repositories and built-in
/// fetch strategies.
pub type Orchestrator = JobOrchestrator<
    JobRepository,
    UrlRepository,
    RuleRepository,
    ResultRepository,
    FetcherRegistry,
    CssFieldExtractor,
>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    pub orchestrator: Orchestrator,
    pub api_key: String,
}

impl AppState {
    pub fn new(db: Database, registry: FetcherRegistry, api_key: String) -> Self {
        let orchestrator = JobOrchestrator::new(
            db.job_repo(),
            db.url_repo(),
            db.rule_repo(),
            db.result_repo(),
            registry,
            CssFieldExtractor::new(),
        );
        Self {
            db,
            orchestrator,
            api_key,
        }
    }
}
