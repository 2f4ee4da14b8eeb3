//! Materializing request values from route, query, form and body data.

use std::cmp::Reverse;

use tokio_util::sync::CancellationToken;

use crate::binding::convert::convert;
use crate::binding::files::FormFile;
use crate::binding::form::{FormReadOptions, PendingForm};
use crate::binding::metadata::{MetadataCache, TypeMetadata};
use crate::binding::shape::{RequestShape, ResolvedValues};
use crate::binding::sources::{BindingSources, FormData, KeyedValues};
use crate::binding::value::{BoundValue, FieldKind};
use crate::error::{BindingError, FennecError};

/// Field name used for errors about the request body as a whole.
pub const BODY_FIELD: &str = "body";

/// Bind `T` from route values, then query values.
///
/// Conversion failures are collected for every field before failing.
pub fn bind_from_route_and_query<T: RequestShape>(
    sources: &BindingSources,
) -> Result<T, BindingError> {
    let meta = MetadataCache::global().metadata::<T>();
    let mut resolved = ResolvedValues::new();
    let mut errors = BindingError::new();

    for field in meta.bindable_fields() {
        if field.field_type.kind.is_file() {
            continue;
        }
        if let Some(raw) = sources.lookup(field.bind_name) {
            match convert(raw, &field.field_type) {
                Ok(value) => resolved.insert(field.name, value),
                Err(e) => errors.add(field.bind_name, e.message()),
            }
        }
    }

    if !errors.is_empty() {
        tracing::debug!(request = meta.type_name(), fields = errors.len(), "route/query binding failed");
        return Err(errors);
    }
    construct::<T>(&meta, resolved)
}

/// Read the pending form and bind `T` from it.
pub async fn bind_from_form<T: RequestShape>(
    sources: &BindingSources,
    form: PendingForm,
    options: &FormReadOptions,
    cancel: &CancellationToken,
) -> Result<T, FennecError> {
    let data = form.read(options, cancel).await?;
    Ok(bind_from_form_data::<T>(sources, data)?)
}

/// Bind `T` from an already-read form.
///
/// File fields are matched against uploaded files first; other fields look
/// up route values, then form fields, then query values. A file field with
/// no matching upload stays unset.
pub fn bind_from_form_data<T: RequestShape>(
    sources: &BindingSources,
    form: FormData,
) -> Result<T, BindingError> {
    let meta = MetadataCache::global().metadata::<T>();
    let mut resolved = ResolvedValues::new();
    let mut errors = BindingError::new();

    for field in meta.bindable_fields() {
        let kind = field.field_type.kind;
        if kind.is_file() {
            if let Some(value) = file_value(kind, field.bind_name, &form) {
                resolved.insert(field.name, value);
            }
            continue;
        }

        let raw = sources
            .route
            .get(field.bind_name)
            .or_else(|| form.fields.get(field.bind_name))
            .or_else(|| sources.query.get(field.bind_name));
        if let Some(raw) = raw {
            match convert(raw, &field.field_type) {
                Ok(value) => resolved.insert(field.name, value),
                Err(e) => errors.add(field.bind_name, e.message()),
            }
        }
    }

    if !errors.is_empty() {
        tracing::debug!(request = meta.type_name(), fields = errors.len(), "form binding failed");
        return Err(errors);
    }
    construct::<T>(&meta, resolved)
}

fn file_value(kind: FieldKind, name: &str, form: &FormData) -> Option<BoundValue> {
    let matching = || form.files_named(name).cloned();
    match kind {
        FieldKind::File => matching().next().map(BoundValue::File),
        FieldKind::FileList => non_empty(matching().collect()).map(BoundValue::Files),
        FieldKind::FileCollection => non_empty(form.files.clone()).map(BoundValue::Files),
        FieldKind::StreamFile => matching()
            .next()
            .map(|f| BoundValue::Stream(f.into_stream_file())),
        FieldKind::StreamFileList => non_empty(matching().collect()).map(|files: Vec<FormFile>| {
            BoundValue::Streams(files.into_iter().map(FormFile::into_stream_file).collect())
        }),
        _ => None,
    }
}

fn non_empty(files: Vec<FormFile>) -> Option<Vec<FormFile>> {
    if files.is_empty() { None } else { Some(files) }
}

/// Decode `T` from a JSON body.
///
/// An empty body, or a type without JSON support, is a binding error on
/// the `body` field.
pub fn bind_from_body<T: RequestShape>(body: &[u8]) -> Result<T, BindingError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(BindingError::single(BODY_FIELD, "A non-empty request body is required."));
    }
    match T::decode_body(body) {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(BindingError::single(BODY_FIELD, e.to_string())),
        None => Err(BindingError::single(
            BODY_FIELD,
            "This request type cannot be read from a JSON body.",
        )),
    }
}

/// Decode `T` from a JSON body, then merge route values into fields the
/// body left at their default.
///
/// When the body is a JSON object, route values also fill members it
/// omits, so a field such as `id` may come from the path alone without
/// the type needing `#[serde(default)]`. Members are keyed by Rust field
/// name.
pub fn bind_from_body_and_route<T: RequestShape>(
    body: &[u8],
    route: &KeyedValues,
) -> Result<T, BindingError> {
    let patched = with_route_members::<T>(body, route);
    let decoded = bind_from_body::<T>(patched.as_deref().unwrap_or(body))?;
    merge_route_parameters(decoded, route)
}

fn with_route_members<T: RequestShape>(body: &[u8], route: &KeyedValues) -> Option<Vec<u8>> {
    if route.is_empty() {
        return None;
    }
    let Ok(serde_json::Value::Object(mut object)) = serde_json::from_slice(body) else {
        return None;
    };
    let meta = MetadataCache::global().metadata::<T>();
    let mut added = false;
    for field in meta.bindable_fields() {
        if object.contains_key(field.name) {
            continue;
        }
        let member = route
            .get(field.bind_name)
            .and_then(|raw| json_member(raw, field.field_type.kind));
        if let Some(member) = member {
            object.insert(field.name.to_string(), member);
            added = true;
        }
    }
    if !added {
        return None;
    }
    serde_json::to_vec(&object).ok()
}

/// A route value as the JSON member serde expects for `kind`. Values that
/// don't fit are left out so decoding reports the field.
fn json_member(raw: &str, kind: FieldKind) -> Option<serde_json::Value> {
    use serde_json::Value;
    match kind {
        FieldKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldKind::I8
        | FieldKind::I16
        | FieldKind::I32
        | FieldKind::I64
        | FieldKind::Isize
        | FieldKind::U8
        | FieldKind::U16
        | FieldKind::U32
        | FieldKind::U64
        | FieldKind::Usize
        | FieldKind::F32
        | FieldKind::F64 => match serde_json::from_str(raw.trim()) {
            Ok(number @ Value::Number(_)) => Some(number),
            _ => None,
        },
        FieldKind::Enum { variants } => variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(raw.trim()))
            .map(|v| Value::String((*v).to_string())),
        FieldKind::Opaque => None,
        kind if kind.is_file() => None,
        _ => Some(Value::String(raw.to_string())),
    }
}

/// Copy route values into fields that still hold their default value.
///
/// Fields the body already set to a non-default value are never
/// overwritten.
pub fn merge_route_parameters<T: RequestShape>(
    mut existing: T,
    route: &KeyedValues,
) -> Result<T, BindingError> {
    if route.is_empty() {
        return Ok(existing);
    }

    let meta = MetadataCache::global().metadata::<T>();
    let mut errors = BindingError::new();
    for field in meta.bindable_fields() {
        if !field.writable || field.field_type.kind.is_file() {
            continue;
        }
        let Some(raw) = route.get(field.bind_name) else {
            continue;
        };
        if !existing.is_field_default(field.name) {
            continue;
        }
        let assigned = convert(raw, &field.field_type)
            .and_then(|value| existing.assign(field.name, value));
        if let Err(e) = assigned {
            errors.add(field.bind_name, e.message());
        }
    }
    errors.into_result(existing)
}

/// Build `T` from resolved values.
///
/// Constructors are tried longest first; one is usable when each parameter
/// has a value or a default. A constructor that fails is skipped. Without a
/// usable constructor, the parameterless instance is created and the
/// values are assigned field by field.
pub(crate) fn construct<T: RequestShape>(
    meta: &TypeMetadata,
    mut resolved: ResolvedValues,
) -> Result<T, BindingError> {
    let mut constructors = T::constructors();
    constructors.sort_by_key(|c| Reverse(c.params().len()));

    let mut failure = BindingError::new();
    for constructor in constructors.iter().filter(|c| !c.params().is_empty()) {
        let missing: Vec<_> = constructor.unsatisfied(&resolved).map(|p| p.name).collect();
        if !missing.is_empty() {
            for name in missing {
                if failure.messages(name).is_none() {
                    failure.add(name, format!("A value for '{}' is required.", name));
                }
            }
            continue;
        }
        match constructor.invoke(&resolved) {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::debug!(request = meta.type_name(), "constructor rejected values: {}", e);
                failure.add(meta.type_name(), e.0);
            }
        }
    }

    let Some(mut instance) = T::default_instance() else {
        if failure.is_empty() {
            failure.add(
                meta.type_name(),
                format!("No way to construct '{}' was found.", meta.type_name()),
            );
        }
        return Err(failure);
    };

    let mut errors = BindingError::new();
    for field in meta.bindable_fields() {
        if !field.writable {
            continue;
        }
        if let Some(value) = resolved.take(field.name)
            && let Err(e) = instance.assign(field.name, value)
        {
            errors.add(field.bind_name, e.message());
        }
    }
    errors.into_result(instance)
}
