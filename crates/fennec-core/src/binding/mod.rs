//! Request binding: raw request data in, typed request values out.

pub mod binder;
pub mod convert;
pub mod files;
pub mod form;
pub mod metadata;
pub mod shape;
pub mod sources;
pub mod value;

pub use binder::{
    bind_from_body, bind_from_body_and_route, bind_from_form, bind_from_form_data,
    bind_from_route_and_query, merge_route_parameters,
};
pub use convert::convert;
pub use files::{FileStream, FormFile, FormFiles, StreamFile};
pub use form::{FormReadOptions, PendingForm};
pub use metadata::{MetadataCache, TypeMetadata};
pub use shape::{
    Constructor, ConstructorArgs, FieldDescriptor, ParamDescriptor, RequestShape, ResolvedValues,
    ShapeDescriptor,
};
pub use sources::{BindingSources, FormData, KeyedValues, normalize_key};
pub use value::{Bindable, BoundValue, FieldKind, FieldType};
