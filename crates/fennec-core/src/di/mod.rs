//! Minimal dependency resolution: services by type, one scope per request.

pub mod factory;
pub mod scope;

pub use factory::{EndpointFactory, FactoryCache, InjectionPlan, ScopedEndpoint};
pub use scope::{
    Dependency, FromScope, GetOrCreate, Injectable, Lifetime, Scope, ServiceCollection,
    ServiceProvider,
};
