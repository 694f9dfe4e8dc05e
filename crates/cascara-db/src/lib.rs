pub mod config;
pub mod database;
pub mod job_repository;
pub mod result_repository;
pub mod rule_repository;
pub mod url_repository;

pub use config::DatabaseConfig;
pub use database::Database;
pub use job_repository::JobRepository;
pub use result_repository::ResultRepository;
pub use rule_repository::RuleRepository;
pub use url_repository::UrlRepository;
