//! Reload-cycle properties exercised through the full pipeline:
//! plugin → aggregator → coordinator → rewiring engine → listeners.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rewire_kernel::container::{BeanState, Container};
use rewire_kernel::reload::{Category, Reloader};
use rewire_kernel::types::{Operation, RequestMethod, TypeDescriptor};
use rewire_reload::{
    CacheFlushReloader, ChangeAggregator, CycleReport, ExistingWaitRecord, RedefinitionPlugin,
    ReloadCoordinator, RewiringEngine, RouteMappingListener, RouteTable, TickOutcome,
};
use rewire_testing::fixtures::{self, controller, repository, service, service_type};
use rewire_testing::{
    FailingReloader, PanickingReloader, RecordingCache, RecordingListener, RecordingReloader,
    StaticRepositoryFactory, assert_processed, init_tracing,
};

struct Harness {
    container: Arc<Container>,
    aggregator: ChangeAggregator,
    plugin: RedefinitionPlugin,
    routes: RouteTable,
    listener: RecordingListener,
}

impl Harness {
    fn new() -> Self {
        Self::with(RewiringEngine::new(), Vec::new())
    }

    fn with(engine: RewiringEngine, extra: Vec<Box<dyn Reloader>>) -> Self {
        init_tracing();
        let container = Arc::new(Container::new());
        let routes = RouteTable::new();
        let listener = RecordingListener::new("recording");

        let engine = engine
            .with_listener(Box::new(RouteMappingListener::new(routes.clone())))
            .with_listener(listener.boxed());
        let mut reloaders: Vec<Box<dyn Reloader>> = vec![Box::new(engine)];
        reloaders.extend(extra);
        for reloader in reloaders.iter_mut() {
            reloader.init(container.clone()).unwrap();
        }

        let aggregator = ChangeAggregator::new(
            ReloadCoordinator::new(reloaders),
            Duration::from_millis(250),
        );
        let plugin = RedefinitionPlugin::new(&fixtures::config(), aggregator.clone());
        Self {
            container,
            aggregator,
            plugin,
            routes,
            listener,
        }
    }

    fn redefine(&self, ty: TypeDescriptor) -> Option<Category> {
        let name = ty.qualified_name().to_string();
        self.plugin
            .on_type_redefined(&name, ty.into_handle(), Utc::now())
    }

    /// Wake the aggregator until it runs a cycle
    async fn cycle(&self) -> CycleReport {
        for _ in 0..3 {
            if let TickOutcome::Cycle(report) = self.aggregator.tick().await {
                return report;
            }
        }
        panic!("no reload cycle ran");
    }

    async fn new_wait(&self) -> Vec<String> {
        self.aggregator
            .with_coordinator(|c| {
                c.find::<RewiringEngine>()
                    .map(|e| e.new_wait_types())
                    .unwrap_or_default()
            })
            .await
    }

    async fn existing_wait(&self) -> Vec<ExistingWaitRecord> {
        self.aggregator
            .with_coordinator(|c| {
                c.find::<RewiringEngine>()
                    .map(|e| e.existing_wait_records())
                    .unwrap_or_default()
            })
            .await
    }
}

#[tokio::test]
async fn simultaneous_service_and_controller_changes_share_one_cycle() {
    let h = Harness::new();
    h.container
        .register_type(service("OrderService").into_handle())
        .unwrap();

    let orders = controller(
        "OrderController",
        &[
            Operation::get("list", "/orders"),
            Operation::post("create", "/orders"),
        ],
    )
    .with_dependency("orders", &service_type("OrderService"));

    assert_eq!(h.redefine(service("OrderService")), Some(Category::Service));
    assert_eq!(h.redefine(orders), Some(Category::Controller));

    let report = h.cycle().await;
    assert!(!report.backlog);
    assert_eq!(h.aggregator.completed_cycles(), 1);

    assert_eq!(h.container.state("orderService"), Some(BeanState::Wired));
    let handler = h.container.get_bean("orderController").unwrap();
    assert_eq!(
        handler.target().unwrap().field("orders").unwrap().name(),
        "orderService"
    );

    assert_eq!(h.routes.len(), 2);
    for method in [RequestMethod::Get, RequestMethod::Post] {
        let route = h.routes.lookup(method, "/orders").unwrap();
        assert_eq!(route.handler, "orderController");
    }
    assert_processed!(h.listener, 1);
}

#[tokio::test]
async fn failed_new_type_is_rolled_back_into_new_wait() {
    let h = Harness::new();
    h.redefine(service("InvoiceService").with_dependency("tax", &service_type("TaxService")));

    let report = h.cycle().await;

    assert!(report.backlog);
    assert!(!h.container.contains_bean("invoiceService"));
    assert_eq!(h.new_wait().await, vec![service_type("InvoiceService")]);
    assert_processed!(h.listener, 0);
}

#[tokio::test]
async fn new_types_referencing_each_other_register_together() {
    let h = Harness::new();
    h.redefine(service("Ping").with_dependency("pong", &service_type("Pong")));
    h.redefine(service("Pong").with_dependency("ping", &service_type("Ping")));

    let report = h.cycle().await;

    assert!(!report.backlog);
    let ping = h.container.get_bean("ping").unwrap();
    let pong = h.container.get_bean("pong").unwrap();
    assert!(Arc::ptr_eq(&ping.target().unwrap().field("pong").unwrap(), &pong));
    assert!(Arc::ptr_eq(&pong.target().unwrap().field("ping").unwrap(), &ping));
}

#[tokio::test]
async fn waiting_bean_completes_once_its_collaborator_arrives() {
    let h = Harness::new();
    h.container
        .register_type(service("CheckoutService").into_handle())
        .unwrap();

    h.redefine(
        service("CheckoutService").with_dependency("payments", &service_type("PaymentService")),
    );
    let first = h.cycle().await;

    assert!(first.backlog);
    let waiting = h.existing_wait().await;
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].missing_type, service_type("PaymentService"));
    assert_eq!(waiting[0].blocked_type, service_type("CheckoutService"));
    assert_processed!(h.listener, 0);

    h.redefine(service("PaymentService"));
    let second = h.cycle().await;

    assert!(!second.backlog);
    assert!(h.existing_wait().await.is_empty());
    assert_eq!(h.container.state("checkoutService"), Some(BeanState::Wired));
    assert_eq!(
        h.listener.reported(),
        vec![
            ("paymentService".to_string(), true),
            ("checkoutService".to_string(), false)
        ]
    );
    assert_processed!(h.listener, 1);
}

#[tokio::test]
async fn live_collaborators_are_not_replaced() {
    let h = Harness::new();
    let mail = |name: &str| service(name).with_capability("com.shop.Mail");
    h.container
        .register_type(mail("SmtpMail").into_handle())
        .unwrap();
    let users = service("UserService").with_dependency("mail", "com.shop.Mail");
    h.container
        .register_type(users.clone().into_handle())
        .unwrap();
    h.container.remove_definition("smtpMail");
    h.container
        .register_type(mail("SandboxMail").into_handle())
        .unwrap();

    h.redefine(users);
    h.cycle().await;

    let target = h.container.get_bean("userService").unwrap().target().unwrap();
    assert_eq!(target.field("mail").unwrap().name(), "smtpMail");
}

#[tokio::test]
async fn empty_cycle_touches_nothing() {
    let h = Harness::new();
    let revision = h.container.revision();

    assert_eq!(h.aggregator.tick().await, TickOutcome::Idle);
    assert_eq!(h.aggregator.completed_cycles(), 0);

    let mut coordinator = ReloadCoordinator::new(vec![Box::new({
        let mut engine = RewiringEngine::new().with_listener(h.listener.boxed());
        engine.init(h.container.clone()).unwrap();
        engine
    })]);
    let report = coordinator.run_cycle(&Default::default()).await;

    assert!(report.reloaded.is_empty());
    assert_eq!(h.container.revision(), revision);
    assert!(h.listener.reported().is_empty());
    assert_processed!(h.listener, 0);
}

#[tokio::test]
async fn failing_reloaders_do_not_stop_the_cycle() {
    let h = Harness::with(
        RewiringEngine::new(),
        vec![
            Box::new(FailingReloader::new(0)),
            Box::new(PanickingReloader::new(1)),
        ],
    );
    h.redefine(service("StockService"));

    let report = h.cycle().await;

    assert_eq!(report.failed, vec!["failing", "panicking"]);
    assert!(report.reloaded.contains(&"rewiring".to_string()));
    assert!(h.container.contains_bean("stockService"));
}

#[tokio::test]
async fn entity_and_dto_changes_flush_caches() {
    let cache = RecordingCache::new("json");
    let recorder = RecordingReloader::new("recorder", 200);
    let h = Harness::with(
        RewiringEngine::new(),
        vec![
            Box::new(CacheFlushReloader::new().with_cache(cache.clone())),
            recorder.boxed(),
        ],
    );

    let entity = fixtures::entity("Order");
    let dto = fixtures::dto("OrderView");
    h.plugin
        .on_type_redefined(entity.qualified_name(), entity.clone(), Utc::now());
    h.plugin
        .on_type_redefined(dto.qualified_name(), dto.clone(), Utc::now());

    let report = h.cycle().await;

    assert_eq!(cache.flush_count(), 1);
    assert_eq!(
        recorder.deliveries(),
        vec![
            (Category::Entity, vec!["com.shop.domain.Order".to_string()]),
            (Category::Dto, vec!["com.shop.web.dto.OrderView".to_string()]),
        ]
    );
    assert_eq!(report.reloaded, vec!["cache-flush", "rewiring", "recorder"]);
    assert!(!h.container.contains_bean("order"));
    assert!(!h.container.contains_bean("orderView"));
}

#[tokio::test]
async fn repositories_are_built_by_the_factory_before_their_clients() {
    let factory = StaticRepositoryFactory::new();
    let h = Harness::with(
        RewiringEngine::new().with_repository_factory(factory.clone()),
        Vec::new(),
    );

    h.redefine(service("CustomerService").with_dependency("customers", "com.shop.repo.CustomerRepository"));
    h.redefine(repository("CustomerRepository"));

    let report = h.cycle().await;

    assert!(!report.backlog);
    assert_eq!(factory.created(), vec!["com.shop.repo.CustomerRepository"]);
    let repo = h
        .container
        .get_bean("customerService")
        .unwrap()
        .target()
        .unwrap()
        .field("customers")
        .unwrap();
    assert_eq!(
        repo.with_payload(|s: &String| s.clone()),
        Some("CustomerRepository".to_string())
    );
}
