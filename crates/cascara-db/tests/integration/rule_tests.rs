use cascara_core::job::{CreateJobRequest, ExtractionRule, JobMode, SelectorType};
use cascara_core::traits::{JobStore, RuleStore};
use cascara_db::{JobRepository, RuleRepository};

use crate::integration::common::setup_test_db;

fn rule(name: &str, selector: &str) -> ExtractionRule {
    ExtractionRule {
        name: name.to_string(),
        selector_type: SelectorType::Css,
        selector: selector.to_string(),
        attribute: None,
        is_list: false,
        is_required: false,
    }
}

#[tokio::test]
async fn rules_round_trip_in_order() {
    let (pool, _container) = setup_test_db().await;
    let job = JobRepository::new(pool.clone())
        .create(&CreateJobRequest::new("rules test", JobMode::List))
        .await
        .unwrap();
    let repo = RuleRepository::new(pool);

    let mut price = rule("price", ".price");
    price.is_required = true;
    let mut tags = rule("tags", ".tags li");
    tags.is_list = true;
    let mut link = rule("link", "a.buy");
    link.attribute = Some("href".to_string());

    repo.set_rules(job.id, &[rule("title", "h1"), price, tags, link])
        .await
        .unwrap();

    let fetched = repo.get_rules(job.id).await.unwrap();
    assert_eq!(fetched.len(), 4);
    assert_eq!(fetched[0].name, "title");
    assert_eq!(fetched[1].name, "price");
    assert!(fetched[1].is_required);
    assert!(fetched[2].is_list);
    assert_eq!(fetched[3].attribute.as_deref(), Some("href"));
}

#[tokio::test]
async fn set_rules_replaces_the_previous_set() {
    let (pool, _container) = setup_test_db().await;
    let job = JobRepository::new(pool.clone())
        .create(&CreateJobRequest::new("rules test", JobMode::List))
        .await
        .unwrap();
    let repo = RuleRepository::new(pool);

    repo.set_rules(job.id, &[rule("title", "h1"), rule("body", "article")])
        .await
        .unwrap();
    repo.set_rules(job.id, &[rule("headline", "h2")])
        .await
        .unwrap();

    let fetched = repo.get_rules(job.id).await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].name, "headline");
}

#[tokio::test]
async fn xpath_selector_type_round_trips() {
    let (pool, _container) = setup_test_db().await;
    let job = JobRepository::new(pool.clone())
        .create(&CreateJobRequest::new("rules test", JobMode::List))
        .await
        .unwrap();
    let repo = RuleRepository::new(pool);

    let mut r = rule("title", "//h1");
    r.selector_type = SelectorType::XPath;
    repo.set_rules(job.id, &[r]).await.unwrap();

    let fetched = repo.get_rules(job.id).await.unwrap();
    assert_eq!(fetched[0].selector_type, SelectorType::XPath);
}

#[tokio::test]
async fn jobs_without_rules_return_empty() {
    let (pool, _container) = setup_test_db().await;
    let job = JobRepository::new(pool.clone())
        .create(&CreateJobRequest::new("rules test", JobMode::List))
        .await
        .unwrap();
    let repo = RuleRepository::new(pool);

    assert!(repo.get_rules(job.id).await.unwrap().is_empty());
}
