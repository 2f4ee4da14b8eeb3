use std::sync::Arc;
use std::thread;

use fennec_core::binding::{FieldKind, MetadataCache};
use fennec_core::{BindRequest, FormFile, FormFiles, StreamFile};

#[derive(BindRequest)]
struct PlainRequest {
    id: i64,
    #[bind(readonly)]
    created_by: Option<String>,
    #[bind(never)]
    secret: String,
}

#[derive(BindRequest)]
struct UploadImageRequest {
    title: Option<String>,
    image: Option<FormFile>,
}

#[derive(BindRequest)]
struct UploadManyRequest {
    files: Vec<FormFile>,
}

#[derive(BindRequest)]
struct UploadAnyRequest {
    all: FormFiles,
}

#[derive(BindRequest)]
struct StreamRequest {
    video: Option<StreamFile>,
}

#[derive(BindRequest)]
struct MarkedFieldRequest {
    #[bind(from_form)]
    comment: String,
}

#[derive(BindRequest)]
#[bind(from_form)]
struct MarkedTypeRequest {
    comment: String,
}

#[test]
fn test_fields_follow_declaration_order() {
    let fields = MetadataCache::global().fields::<PlainRequest>();
    let names: Vec<_> = fields.iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["id", "created_by", "secret"]);

    assert!(fields[0].writable);
    assert!(!fields[1].writable);
    assert!(fields[1].field_type.nullable);
    assert!(fields[2].never_bind);
    assert!(matches!(fields[2].field_type.kind, FieldKind::Opaque));
}

#[test]
fn test_bindable_fields_skip_never() {
    let meta = MetadataCache::global().metadata::<PlainRequest>();
    let names: Vec<_> = meta.bindable_fields().map(|f| f.name).collect();
    assert_eq!(names, vec!["id", "created_by"]);
}

#[test]
fn test_requires_multipart() {
    let cache = MetadataCache::global();
    assert!(!cache.requires_multipart::<PlainRequest>());
    assert!(cache.requires_multipart::<UploadImageRequest>());
    assert!(cache.requires_multipart::<UploadManyRequest>());
    assert!(cache.requires_multipart::<UploadAnyRequest>());
    assert!(cache.requires_multipart::<StreamRequest>());
    assert!(cache.requires_multipart::<MarkedFieldRequest>());
    assert!(cache.requires_multipart::<MarkedTypeRequest>());
}

#[test]
fn test_metadata_is_computed_once() {
    let cache = MetadataCache::new();
    assert!(cache.is_empty());

    let first = cache.metadata::<UploadImageRequest>();
    let second = cache.metadata::<UploadImageRequest>();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);

    cache.metadata::<PlainRequest>();
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_concurrent_first_access_sees_one_entry() {
    let cache = Arc::new(MetadataCache::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || cache.metadata::<UploadManyRequest>())
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for meta in &results {
        assert!(Arc::ptr_eq(meta, &results[0]));
        assert_eq!(meta.fields().len(), 1);
    }
    assert_eq!(cache.len(), 1);
}
