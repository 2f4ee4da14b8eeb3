use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fennec_core::di::{
    EndpointFactory, FactoryCache, Injectable, Lifetime, Scope, ServiceCollection,
};
use fennec_core::{Injectable, ResolveError};

struct Counter(AtomicUsize);

impl Counter {
    fn next(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

struct Stamp(usize);

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

fn services() -> fennec_core::ServiceProvider {
    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    let scoped_counter = counter.clone();
    let transient_counter = counter.clone();
    ServiceCollection::new()
        .add_singleton(counter)
        .add_scoped(move |_| Ok(Arc::new(Stamp(scoped_counter.next()))))
        .add_transient(move |_| Ok(Arc::new(transient_counter.next() as u64)))
        .add_singleton::<dyn Greeter>(Arc::new(English))
        .build()
}

#[test]
fn test_lifetimes() {
    let provider = services();
    assert_eq!(provider.lifetime_of::<Stamp>(), Some(Lifetime::Scoped));
    assert_eq!(provider.lifetime_of::<u64>(), Some(Lifetime::Transient));
    assert_eq!(provider.lifetime_of::<Counter>(), Some(Lifetime::Singleton));

    let first = provider.create_scope();
    let a = first.get::<Stamp>().unwrap();
    let b = first.get::<Stamp>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let second = provider.create_scope();
    let c = second.get::<Stamp>().unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_ne!(first.id(), second.id());

    let x = first.get::<u64>().unwrap();
    let y = first.get::<u64>().unwrap();
    assert_ne!(x, y);

    let s1 = first.get::<Counter>().unwrap();
    let s2 = second.get::<Counter>().unwrap();
    assert!(Arc::ptr_eq(&s1, &s2));
}

#[test]
fn test_trait_object_service() {
    let scope = services().create_scope();
    assert_eq!(scope.get::<dyn Greeter>().unwrap().greet(), "hello");
}

#[test]
fn test_unregistered_service() {
    let scope = services().create_scope();
    assert!(scope.try_get::<String>().unwrap().is_none());
    assert!(matches!(
        scope.get::<String>(),
        Err(ResolveError::NotRegistered { .. })
    ));
}

#[derive(Injectable)]
struct Greeting {
    greeter: Arc<dyn Greeter>,
    stamp: Arc<Stamp>,
    audit: Option<Arc<String>>,
    #[inject(default)]
    calls: Vec<String>,
}

#[derive(Injectable)]
struct Page {
    #[inject(create)]
    greeting: Arc<Greeting>,
    scope: Scope,
}

#[test]
fn test_derived_injectable() {
    let scope = services().create_scope();
    let greeting = Greeting::inject(&scope).unwrap();
    assert_eq!(greeting.greeter.greet(), "hello");
    assert!(greeting.audit.is_none());
    assert!(greeting.calls.is_empty());
    assert!(Arc::ptr_eq(&greeting.stamp, &scope.get::<Stamp>().unwrap()));

    let deps = Greeting::dependencies();
    assert_eq!(deps.len(), 3);
    assert!(!deps[0].optional);
    assert!(deps[2].optional);
}

#[test]
fn test_get_or_create_builds_unregistered_types() {
    let scope = services().create_scope();
    let page = Page::inject(&scope).unwrap();
    assert_eq!(page.greeting.greeter.greet(), "hello");
    assert_eq!(page.scope.id(), scope.id());
    assert!(Page::dependencies().is_empty());
}

#[derive(Injectable)]
struct NeedsMissing {
    _name: Arc<String>,
}

#[test]
fn test_plan_reports_missing_dependencies() {
    let provider = services();
    let plan = FactoryCache::global().plan::<NeedsMissing>();
    assert_eq!(plan.missing(&provider), vec![std::any::type_name::<String>()]);

    let again = FactoryCache::global().plan::<NeedsMissing>();
    assert!(Arc::ptr_eq(&plan, &again));

    let factory = EndpointFactory::<NeedsMissing>::build();
    assert!(matches!(
        factory.create(&provider),
        Err(ResolveError::NotRegistered { .. })
    ));
}

struct DropLog(Arc<Mutex<Vec<&'static str>>>);

struct Tracked {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.log.lock().unwrap().push("service");
    }
}

#[derive(Injectable)]
struct TrackedEndpoint {
    _tracked: Arc<Tracked>,
    log: Arc<DropLog>,
}

impl Drop for TrackedEndpoint {
    fn drop(&mut self) {
        self.log.0.lock().unwrap().push("endpoint");
    }
}

#[test]
fn test_scoped_endpoint_drops_endpoint_then_scope() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let scoped_log = log.clone();
    let provider = ServiceCollection::new()
        .add_singleton(Arc::new(DropLog(log.clone())))
        .add_scoped(move |_| {
            Ok(Arc::new(Tracked {
                log: scoped_log.clone(),
            }))
        })
        .build();

    let factory = EndpointFactory::<TrackedEndpoint>::build();
    let endpoint = factory.create(&provider).unwrap();
    assert!(endpoint.scope().id() > 0);
    drop(endpoint);

    assert_eq!(*log.lock().unwrap(), vec!["endpoint", "service"]);
}

struct SlowSingleton;

struct Clock;

#[test]
fn test_concurrent_first_resolution_builds_singleton_once() {
    let built = Arc::new(AtomicUsize::new(0));
    let factory_count = built.clone();
    let provider = ServiceCollection::new()
        .add_singleton(Arc::new(Clock))
        .add_singleton_with(move |scope| {
            // Nested resolution of another singleton must not block.
            scope.get::<Clock>()?;
            factory_count.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(Arc::new(SlowSingleton))
        })
        .build();

    let barrier = Arc::new(std::sync::Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let provider = provider.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                provider.create_scope().get::<SlowSingleton>().unwrap()
            })
        })
        .collect();
    let resolved: Vec<Arc<SlowSingleton>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(resolved.iter().all(|s| Arc::ptr_eq(s, &resolved[0])));
}
