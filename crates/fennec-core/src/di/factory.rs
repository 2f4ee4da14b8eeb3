use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::di::scope::{Dependency, Injectable, Scope, ServiceProvider};
use crate::error::ResolveError;

/// How an endpoint type is built: its dependencies, computed once.
#[derive(Debug, Clone)]
pub struct InjectionPlan {
    pub endpoint: &'static str,
    pub dependencies: Vec<Dependency>,
}

impl InjectionPlan {
    /// Required dependencies the provider cannot supply.
    pub fn missing(&self, provider: &ServiceProvider) -> Vec<&'static str> {
        self.dependencies
            .iter()
            .filter(|d| !d.optional && !provider.is_registered_id(d.type_id))
            .map(|d| d.service)
            .collect()
    }
}

/// Injection plans keyed by endpoint type.
#[derive(Default)]
pub struct FactoryCache {
    plans: RwLock<HashMap<TypeId, Arc<InjectionPlan>>>,
}

static PLANS: LazyLock<FactoryCache> = LazyLock::new(FactoryCache::default);

impl FactoryCache {
    pub fn global() -> &'static FactoryCache {
        &PLANS
    }

    pub fn plan<E: Injectable>(&self) -> Arc<InjectionPlan> {
        let key = TypeId::of::<E>();
        if let Some(found) = self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return found.clone();
        }

        let plan = Arc::new(InjectionPlan {
            endpoint: type_name::<E>(),
            dependencies: E::dependencies(),
        });
        self.plans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(plan)
            .clone()
    }
}

/// Creates endpoint instances, each inside its own scope.
pub struct EndpointFactory<E> {
    plan: Arc<InjectionPlan>,
    _endpoint: PhantomData<fn() -> E>,
}

impl<E> Clone for EndpointFactory<E> {
    fn clone(&self) -> Self {
        EndpointFactory {
            plan: self.plan.clone(),
            _endpoint: PhantomData,
        }
    }
}

impl<E: Injectable> EndpointFactory<E> {
    pub fn build() -> Self {
        EndpointFactory {
            plan: FactoryCache::global().plan::<E>(),
            _endpoint: PhantomData,
        }
    }

    pub fn plan(&self) -> &InjectionPlan {
        &self.plan
    }

    /// Open a scope and build the endpoint inside it.
    ///
    /// On failure the fresh scope is dropped before the error is returned.
    pub fn create(&self, provider: &ServiceProvider) -> Result<ScopedEndpoint<E>, ResolveError> {
        let scope = provider.create_scope();
        match E::inject(&scope) {
            Ok(endpoint) => Ok(ScopedEndpoint { endpoint, scope }),
            Err(e) => {
                tracing::warn!(endpoint = self.plan.endpoint, scope = scope.id(), "{}", e);
                Err(e)
            }
        }
    }
}

/// An endpoint instance together with the scope that owns its services.
///
/// Dropping it drops the endpoint first, then the scope, on every exit
/// path including unwinding.
pub struct ScopedEndpoint<E> {
    endpoint: E,
    scope: Scope,
}

impl<E> ScopedEndpoint<E> {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl<E> Deref for ScopedEndpoint<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.endpoint
    }
}

impl<E> Drop for ScopedEndpoint<E> {
    fn drop(&mut self) {
        tracing::trace!(scope = self.scope.id(), "releasing endpoint");
    }
}
