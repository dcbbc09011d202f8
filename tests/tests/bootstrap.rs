//! End-to-end runs of a started [`HotReload`] with its background loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rewire_kernel::container::Container;
use rewire_kernel::reload::Category;
use rewire_kernel::types::{Operation, RequestMethod};
use rewire_reload::{
    AggregatorPhase, CacheFlushReloader, HotReload, RewiringEngine, RouteMappingListener,
    RouteTable,
};
use rewire_testing::fixtures::{self, controller, service, service_type};
use rewire_testing::{RecordingCache, init_tracing};

#[tokio::test(start_paused = true)]
async fn redefinitions_are_applied_after_the_debounce_window() {
    init_tracing();
    let routes = RouteTable::new();
    let engine =
        RewiringEngine::new().with_listener(Box::new(RouteMappingListener::new(routes.clone())));
    let hot_reload = HotReload::builder(fixtures::config().with_batch_delay(Duration::from_millis(100)))
        .engine(engine)
        .start()
        .unwrap()
        .expect("hot reload is enabled");

    let catalog = controller("CatalogController", &[Operation::get("browse", "/catalog")])
        .with_dependency("search", &service_type("SearchService"))
        .into_handle();
    let search = service("SearchService").into_handle();

    assert_eq!(
        hot_reload.on_type_redefined(catalog.qualified_name(), catalog.clone(), Utc::now()),
        Some(Category::Controller)
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    hot_reload.on_type_redefined(search.qualified_name(), search.clone(), Utc::now());
    assert_eq!(hot_reload.aggregator().phase(), AggregatorPhase::Pending);

    // One wake-up absorbs the burst, the next one runs the cycle
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(hot_reload.aggregator().completed_cycles(), 1);
    assert_eq!(hot_reload.aggregator().phase(), AggregatorPhase::Idle);
    assert!(hot_reload.container().contains_bean("catalogController"));
    assert!(hot_reload.container().contains_bean("searchService"));
    assert_eq!(
        routes.lookup(RequestMethod::Get, "/catalog").unwrap().handler,
        "catalogController"
    );

    hot_reload.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn backlog_is_retried_every_interval_until_resolved() {
    init_tracing();
    let container = Arc::new(Container::new());
    let hot_reload = HotReload::builder(fixtures::config())
        .container(container.clone())
        .start()
        .unwrap()
        .unwrap();

    let report = service("ReportService")
        .with_dependency("clock", &service_type("ClockService"))
        .into_handle();
    hot_reload.on_type_redefined(report.qualified_name(), report.clone(), Utc::now());

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    let cycles = hot_reload.aggregator().completed_cycles();
    assert!(cycles >= 5, "expected repeated retries, got {cycles}");
    assert!(!container.contains_bean("reportService"));
    assert_eq!(hot_reload.aggregator().phase(), AggregatorPhase::Pending);

    let clock = service("ClockService").into_handle();
    hot_reload.on_type_redefined(clock.qualified_name(), clock.clone(), Utc::now());
    tokio::time::sleep(Duration::from_millis(1_000)).await;

    assert!(container.contains_bean("reportService"));
    assert_eq!(hot_reload.aggregator().phase(), AggregatorPhase::Idle);

    hot_reload.shutdown().await.unwrap();
}

#[tokio::test]
async fn additional_reloaders_are_ordered_before_the_engine() {
    let cache = RecordingCache::new("json");
    let hot_reload = HotReload::builder(fixtures::config())
        .reloader(Box::new(CacheFlushReloader::new().with_cache(cache)))
        .start()
        .unwrap()
        .unwrap();

    let names = hot_reload
        .aggregator()
        .with_coordinator(|c| c.reloader_names())
        .await;
    assert_eq!(names, vec!["cache-flush", "rewiring"]);

    hot_reload.shutdown().await.unwrap();
}

#[tokio::test]
async fn disabled_hot_reload_registers_nothing() {
    let started = HotReload::start(fixtures::config().with_enabled(false)).unwrap();
    assert!(started.is_none());
}

#[test]
fn config_file_drives_the_classifier() {
    use std::io::Write;

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "enabled: true\npackages:\n  project: com.shop\n  domain: com.shop.domain\ncategories:\n  controller: false"
    )
    .unwrap();

    let config = HotReload::load_config(file.path().to_str().unwrap()).unwrap();
    assert!(config.enabled);
    assert_eq!(config.packages.domain, fixtures::DOMAIN);
    assert!(!config.categories.is_enabled(Category::Controller));
    assert!(config.categories.is_enabled(Category::Service));
}
