use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::ResolveError;

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Scope) -> Result<Instance, ResolveError> + Send + Sync>;

/// How long a resolved service lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// One instance for the whole provider.
    Singleton,
    /// One instance per request scope.
    Scoped,
    /// A new instance on every resolution.
    Transient,
}

struct Registration {
    lifetime: Lifetime,
    service: &'static str,
    factory: Factory,
}

/// Service registrations, frozen into a [`ServiceProvider`] by [`build`](Self::build).
///
/// Services are keyed by type and always handed out as `Arc<T>`; `T` may be
/// a trait object.
///
/// ```rust,ignore
/// let services = ServiceCollection::new()
///     .add_singleton(Arc::new(Clock::system()))
///     .add_scoped(|_| Ok(Arc::new(UnitOfWork::default())))
///     .build();
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    registrations: HashMap<TypeId, Registration>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn register<T, F>(mut self, lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Scope) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |scope: &Scope| factory(scope).map(|svc| Arc::new(svc) as Instance));
        self.registrations.insert(
            TypeId::of::<T>(),
            Registration {
                lifetime,
                service: type_name::<T>(),
                factory,
            },
        );
        self
    }

    /// Register an existing instance as a singleton.
    pub fn add_singleton<T>(self, instance: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register::<T, _>(Lifetime::Singleton, move |_| Ok(instance.clone()))
    }

    /// Register a singleton created on first use.
    pub fn add_singleton_with<T, F>(self, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Scope) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    {
        self.register(Lifetime::Singleton, factory)
    }

    pub fn add_scoped<T, F>(self, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Scope) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    {
        self.register(Lifetime::Scoped, factory)
    }

    pub fn add_transient<T, F>(self, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Scope) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    {
        self.register(Lifetime::Transient, factory)
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<T>())
    }

    pub fn build(self) -> ServiceProvider {
        let creation_gates = self
            .registrations
            .iter()
            .filter(|(_, r)| r.lifetime == Lifetime::Singleton)
            .map(|(key, _)| (*key, Mutex::new(())))
            .collect();
        ServiceProvider {
            inner: Arc::new(ProviderInner {
                registrations: self.registrations,
                singletons: RwLock::new(HashMap::new()),
                creation_gates,
                next_scope: AtomicU64::new(1),
            }),
        }
    }
}

struct ProviderInner {
    registrations: HashMap<TypeId, Registration>,
    singletons: RwLock<HashMap<TypeId, Instance>>,
    /// One per singleton, held while its factory runs.
    creation_gates: HashMap<TypeId, Mutex<()>>,
    next_scope: AtomicU64,
}

/// Resolves registered services and opens request scopes. Cheap to clone.
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    /// A provider with no registrations.
    pub fn empty() -> Self {
        ServiceCollection::new().build()
    }

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.inner.registrations.contains_key(&TypeId::of::<T>())
    }

    pub(crate) fn is_registered_id(&self, type_id: TypeId) -> bool {
        self.inner.registrations.contains_key(&type_id)
    }

    pub fn lifetime_of<T: ?Sized + 'static>(&self) -> Option<Lifetime> {
        self.inner
            .registrations
            .get(&TypeId::of::<T>())
            .map(|r| r.lifetime)
    }

    /// Open a new resolution scope.
    pub fn create_scope(&self) -> Scope {
        let id = self.inner.next_scope.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(scope = id, "scope created");
        Scope {
            inner: Arc::new(ScopeInner {
                id,
                provider: self.clone(),
                instances: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn cached_singleton(&self, key: TypeId) -> Option<Instance> {
        self.inner
            .singletons
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Double-checked: concurrent first resolutions of the same singleton
    /// wait on its gate, and only the first runs the factory. Gates are per
    /// service, so a factory may resolve other singletons.
    fn singleton(
        &self,
        key: TypeId,
        registration: &Registration,
        scope: &Scope,
    ) -> Result<Instance, ResolveError> {
        if let Some(found) = self.cached_singleton(key) {
            return Ok(found);
        }

        let _gate = self
            .inner
            .creation_gates
            .get(&key)
            .map(|gate| gate.lock().unwrap_or_else(PoisonError::into_inner));
        if let Some(found) = self.cached_singleton(key) {
            return Ok(found);
        }

        let created = (registration.factory)(scope)?;
        let mut singletons = self
            .inner
            .singletons
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(singletons.entry(key).or_insert(created).clone())
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("registrations", &self.inner.registrations.len())
            .finish()
    }
}

struct ScopeInner {
    id: u64,
    provider: ServiceProvider,
    instances: Mutex<HashMap<TypeId, Instance>>,
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        let released = self
            .instances
            .get_mut()
            .map(|m| m.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len());
        tracing::trace!(scope = self.id, released, "scope released");
    }
}

/// A resolution scope, normally one per request.
///
/// Scoped services live until the last clone of the scope is dropped.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn provider(&self) -> &ServiceProvider {
        &self.inner.provider
    }

    /// Resolve a registered service.
    pub fn get<T>(&self) -> Result<Arc<T>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.try_get::<T>()?
            .ok_or(ResolveError::NotRegistered {
                service: type_name::<T>(),
            })
    }

    /// Resolve a service, or `None` when it is not registered.
    pub fn try_get<T>(&self) -> Result<Option<Arc<T>>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeId::of::<T>();
        let Some(registration) = self.inner.provider.inner.registrations.get(&key) else {
            return Ok(None);
        };

        let instance = match registration.lifetime {
            Lifetime::Singleton => self.inner.provider.singleton(key, registration, self)?,
            Lifetime::Transient => (registration.factory)(self)?,
            Lifetime::Scoped => {
                let cached = self
                    .inner
                    .instances
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&key)
                    .cloned();
                match cached {
                    Some(found) => found,
                    None => {
                        let created = (registration.factory)(self)?;
                        self.inner
                            .instances
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .entry(key)
                            .or_insert(created)
                            .clone()
                    }
                }
            }
        };

        instance
            .downcast_ref::<Arc<T>>()
            .cloned()
            .map(Some)
            .ok_or_else(|| ResolveError::Factory {
                service: registration.service,
                message: "registered factory produced a different type".to_string(),
            })
    }

    /// The registered instance of `T`, or a new one built through its
    /// [`Injectable`] implementation.
    pub fn get_or_create<T: Injectable + Sync>(&self) -> Result<Arc<T>, ResolveError> {
        match self.try_get::<T>()? {
            Some(found) => Ok(found),
            None => T::inject(self).map(Arc::new),
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("id", &self.inner.id).finish()
    }
}

/// A dependency declared by an injectable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub service: &'static str,
    pub type_id: TypeId,
    /// Resolution succeeds even when the service is not registered.
    pub optional: bool,
}

impl Dependency {
    pub fn required<T: ?Sized + 'static>() -> Self {
        Dependency {
            service: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            optional: false,
        }
    }

    pub fn optional<T: ?Sized + 'static>() -> Self {
        Dependency {
            optional: true,
            ..Self::required::<T>()
        }
    }
}

/// A value that can be pulled out of a [`Scope`].
pub trait FromScope: Sized {
    fn from_scope(scope: &Scope) -> Result<Self, ResolveError>;

    fn dependency() -> Option<Dependency> {
        None
    }
}

impl<T: ?Sized + Send + Sync + 'static> FromScope for Arc<T> {
    fn from_scope(scope: &Scope) -> Result<Self, ResolveError> {
        scope.get::<T>()
    }

    fn dependency() -> Option<Dependency> {
        Some(Dependency::required::<T>())
    }
}

impl<T: ?Sized + Send + Sync + 'static> FromScope for Option<Arc<T>> {
    fn from_scope(scope: &Scope) -> Result<Self, ResolveError> {
        scope.try_get::<T>()
    }

    fn dependency() -> Option<Dependency> {
        Some(Dependency::optional::<T>())
    }
}

impl FromScope for Scope {
    fn from_scope(scope: &Scope) -> Result<Self, ResolveError> {
        Ok(scope.clone())
    }
}

impl FromScope for ServiceProvider {
    fn from_scope(scope: &Scope) -> Result<Self, ResolveError> {
        Ok(scope.provider().clone())
    }
}

/// `Arc<T>` fields marked `#[inject(create)]`: the registered instance, or
/// one built from `T`'s own dependencies.
pub trait GetOrCreate: Sized {
    fn get_or_create(scope: &Scope) -> Result<Self, ResolveError>;
}

impl<T: Injectable + Sync> GetOrCreate for Arc<T> {
    fn get_or_create(scope: &Scope) -> Result<Self, ResolveError> {
        scope.get_or_create::<T>()
    }
}

/// A type constructed from a scope's services.
///
/// Usually implemented with `#[derive(Injectable)]`, which resolves each
/// field through [`FromScope`].
pub trait Injectable: Sized + Send + 'static {
    /// Services the type asks for, in field order.
    fn dependencies() -> Vec<Dependency> {
        Vec::new()
    }

    fn inject(scope: &Scope) -> Result<Self, ResolveError>;
}
