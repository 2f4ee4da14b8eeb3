extern crate proc_macro;

mod bind_request;
mod bind_value;
mod injectable;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Describe a request type to the binder.
///
/// ```rust,ignore
/// #[derive(BindRequest, Deserialize)]
/// #[bind(json)]
/// pub struct UpdateUserRequest {
///     pub id: i32,
///     pub name: Option<String>,
///     #[bind(never)]
///     pub audit: AuditInfo,
/// }
/// ```
///
/// Field attributes: `never`, `from_form`, `readonly`, `rename = ".."`,
/// `default`, `default = "expr"`.
/// Container attributes: `json`, `default`, `only(a, b)`, `from_form`.
///
/// `json` types decode with `serde_json`. Route values fill members the
/// body omits (keyed by Rust field name), so `id` above may come from
/// `/users/{id}` alone. Any other field the body may leave out needs
/// `Option`, `#[serde(default)]` on the field, or `#[serde(default)]` on
/// the container; otherwise the missing member is a `400`.
#[proc_macro_derive(BindRequest, attributes(bind))]
pub fn derive_bind_request(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bind_request::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Make a fieldless enum bindable by variant name or ordinal.
#[proc_macro_derive(BindValue, attributes(bind))]
pub fn derive_bind_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bind_value::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Build a type from a dependency scope, one field at a time.
///
/// `Arc<S>` fields resolve a registered service, `Option<Arc<S>>` fields
/// are optional. `#[inject(create)]` builds the service from its own
/// dependencies when it isn't registered; `#[inject(default)]` uses
/// `Default`.
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
