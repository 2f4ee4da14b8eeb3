use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::binding::shape::{FieldDescriptor, RequestShape, ShapeDescriptor};

/// Everything the binder needs to know about a request type.
#[derive(Debug)]
pub struct TypeMetadata {
    pub shape: ShapeDescriptor,
    pub requires_multipart: bool,
    bindable: Vec<usize>,
}

impl TypeMetadata {
    fn compute(shape: ShapeDescriptor) -> Self {
        let requires_multipart = shape.from_form
            || shape
                .fields
                .iter()
                .any(|f| f.from_form || f.field_type.kind.is_file());
        let bindable = shape
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| shape.is_bindable(f))
            .map(|(i, _)| i)
            .collect();
        TypeMetadata {
            shape,
            requires_multipart,
            bindable,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.shape.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.shape.fields
    }

    /// Fields the binder may fill, in declaration order.
    pub fn bindable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.bindable.iter().map(|&i| &self.shape.fields[i])
    }
}

/// Memoized [`TypeMetadata`] keyed by type identity.
///
/// Entries are computed outside the lock and inserted with a second check,
/// so concurrent first use may compute twice but always observes a single,
/// complete entry.
#[derive(Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<TypeId, Arc<TypeMetadata>>>,
}

static GLOBAL: LazyLock<MetadataCache> = LazyLock::new(MetadataCache::new);

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used by the binder.
    pub fn global() -> &'static MetadataCache {
        &GLOBAL
    }

    pub fn metadata<T: RequestShape>(&self) -> Arc<TypeMetadata> {
        let key = TypeId::of::<T>();
        if let Some(found) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return found.clone();
        }

        let computed = Arc::new(TypeMetadata::compute(T::describe()));
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_insert(computed).clone()
    }

    pub fn fields<T: RequestShape>(&self) -> Vec<FieldDescriptor> {
        self.metadata::<T>().fields().to_vec()
    }

    pub fn requires_multipart<T: RequestShape>(&self) -> bool {
        self.metadata::<T>().requires_multipart
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
