//! Static description of request types.
//!
//! `#[derive(BindRequest)]` implements [`RequestShape`]; the binder only ever
//! talks to request types through it.

use std::fmt;

use crate::binding::value::{Bindable, BoundValue, FieldType};
use crate::binding::sources::normalize_key;
use crate::error::{ConstructError, ConversionError};

/// One field of a request type.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Rust field name.
    pub name: &'static str,
    /// Key looked up in route/query/form values.
    pub bind_name: &'static str,
    pub field_type: FieldType,
    /// Whether the binder may assign the field after construction.
    pub writable: bool,
    pub never_bind: bool,
    pub from_form: bool,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        FieldDescriptor {
            name,
            bind_name: name,
            field_type,
            writable: true,
            never_bind: false,
            from_form: false,
        }
    }

    pub fn bind_name(mut self, bind_name: &'static str) -> Self {
        self.bind_name = bind_name;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn never_bind(mut self) -> Self {
        self.never_bind = true;
        self
    }

    pub fn from_form(mut self) -> Self {
        self.from_form = true;
        self
    }
}

/// The full description of a request type.
#[derive(Debug, Clone)]
pub struct ShapeDescriptor {
    pub type_name: &'static str,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// When set, only these fields (by Rust or bind name) are bound.
    pub allow_only: Option<Vec<&'static str>>,
    /// The whole type is bound from a form.
    pub from_form: bool,
    /// The type can be decoded from a JSON body.
    pub json_body: bool,
}

impl ShapeDescriptor {
    pub fn new(type_name: &'static str) -> Self {
        ShapeDescriptor {
            type_name,
            fields: Vec::new(),
            allow_only: None,
            from_form: false,
            json_body: false,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn allow_only(mut self, names: &[&'static str]) -> Self {
        self.allow_only = Some(names.to_vec());
        self
    }

    pub fn from_form(mut self) -> Self {
        self.from_form = true;
        self
    }

    pub fn json_body(mut self) -> Self {
        self.json_body = true;
        self
    }

    /// Whether the binder may fill `field` from request data.
    pub fn is_bindable(&self, field: &FieldDescriptor) -> bool {
        if field.never_bind {
            return false;
        }
        match &self.allow_only {
            Some(allowed) => allowed.iter().any(|name| {
                let name = normalize_key(name);
                name == normalize_key(field.name) || name == normalize_key(field.bind_name)
            }),
            None => true,
        }
    }
}

/// Converted values keyed by Rust field name, consumed by construction.
#[derive(Debug, Default, Clone)]
pub struct ResolvedValues {
    values: Vec<(&'static str, BoundValue)>,
}

impl ResolvedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &'static str, value: BoundValue) {
        match self.values.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.values.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&BoundValue> {
        self.values
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn take(&mut self, field: &str) -> Option<BoundValue> {
        let index = self.values.iter().position(|(name, _)| *name == field)?;
        Some(self.values.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    /// Rust field name the parameter initializes.
    pub name: &'static str,
    /// The parameter can be satisfied without a resolved value.
    pub has_default: bool,
}

impl ParamDescriptor {
    pub const fn new(name: &'static str, has_default: bool) -> Self {
        ParamDescriptor { name, has_default }
    }
}

type Invoke<T> = Box<dyn Fn(&ConstructorArgs<'_>) -> Result<T, ConstructError> + Send + Sync>;

/// A way of building `T` from resolved values.
pub struct Constructor<T> {
    params: Vec<ParamDescriptor>,
    invoke: Invoke<T>,
}

impl<T> Constructor<T> {
    pub fn new<F>(params: Vec<ParamDescriptor>, invoke: F) -> Self
    where
        F: Fn(&ConstructorArgs<'_>) -> Result<T, ConstructError> + Send + Sync + 'static,
    {
        Constructor {
            params,
            invoke: Box::new(invoke),
        }
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// Parameters that have neither a resolved value nor a default.
    pub fn unsatisfied<'a>(&'a self, values: &'a ResolvedValues) -> impl Iterator<Item = &'a ParamDescriptor> {
        self.params
            .iter()
            .filter(move |p| !p.has_default && !values.contains(p.name))
    }

    pub fn invoke(&self, values: &ResolvedValues) -> Result<T, ConstructError> {
        (self.invoke)(&ConstructorArgs { values })
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Argument access handed to a constructor.
pub struct ConstructorArgs<'a> {
    values: &'a ResolvedValues,
}

impl ConstructorArgs<'_> {
    /// The resolved value for `field`, or the type's absent value (`None`
    /// for options, empty for file lists).
    pub fn value<T: Bindable>(&self, field: &str) -> Result<T, ConstructError> {
        match self.values.get(field) {
            Some(value) => T::from_bound(value.clone()).map_err(ConstructError::from),
            None => T::absent().ok_or_else(|| {
                ConstructError(format!("A value for '{}' is required.", field))
            }),
        }
    }

    /// The resolved value for `field`, or `fallback()` when there is none.
    pub fn value_or_else<T: Bindable>(
        &self,
        field: &str,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, ConstructError> {
        match self.values.get(field) {
            Some(value) => T::from_bound(value.clone()).map_err(ConstructError::from),
            None => Ok(fallback()),
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.values.contains(field)
    }
}

/// A request type the binder can materialize.
pub trait RequestShape: Sized + Send + 'static {
    fn describe() -> ShapeDescriptor;

    /// Constructors that take field values as parameters.
    fn constructors() -> Vec<Constructor<Self>> {
        Vec::new()
    }

    /// Parameterless construction, used when no constructor applies.
    fn default_instance() -> Option<Self> {
        None
    }

    /// Store a converted value into a writable field.
    fn assign(&mut self, field: &str, value: BoundValue) -> Result<(), ConversionError>;

    /// Whether `field` currently holds its type's default value.
    fn is_field_default(&self, field: &str) -> bool;

    /// Decode a JSON body, for types that support it.
    fn decode_body(body: &[u8]) -> Option<Result<Self, serde_json::Error>> {
        let _ = body;
        None
    }
}

/// The "no request" shape.
impl RequestShape for () {
    fn describe() -> ShapeDescriptor {
        ShapeDescriptor::new("()")
    }

    fn default_instance() -> Option<Self> {
        Some(())
    }

    fn assign(&mut self, _field: &str, _value: BoundValue) -> Result<(), ConversionError> {
        Ok(())
    }

    fn is_field_default(&self, _field: &str) -> bool {
        true
    }
}
