use axum::body::Body;
use axum::extract::Request;
use axum::http::header;
use fennec_core::binding::{
    BindingSources, FormData, FormReadOptions, KeyedValues, PendingForm, bind_from_form,
    bind_from_form_data,
};
use fennec_core::{
    BindRequest, FennecError, FileBindingMode, FormFile, FormFiles, FormOptions, StreamFile,
};
use tokio_util::sync::CancellationToken;

const BOUNDARY: &str = "fennec-test-boundary";

#[derive(Debug, BindRequest)]
struct UploadImageRequest {
    title: Option<String>,
    image: Option<FormFile>,
}

#[derive(Debug, BindRequest)]
struct UploadMultipleRequest {
    files: Vec<FormFile>,
    description: Option<String>,
}

#[derive(Debug, BindRequest)]
struct UploadAnyRequest {
    all: FormFiles,
}

#[derive(Debug, BindRequest)]
struct StreamUploadRequest {
    video: Option<StreamFile>,
}

#[derive(Debug, BindRequest)]
struct CommentRequest {
    id: i32,
    #[bind(from_form)]
    comment: String,
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, content_type, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(parts: &[Part<'_>]) -> Request {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

async fn read_form(request: Request, options: &FormReadOptions) -> Result<FormData, FennecError> {
    PendingForm::from_request(request)
        .await?
        .read(options, &CancellationToken::new())
        .await
}

fn file(name: &str, file_name: &str, bytes: &'static [u8]) -> FormFile {
    FormFile::from_bytes(
        name,
        Some(file_name.to_string()),
        Some("application/octet-stream".to_string()),
        bytes,
    )
}

#[test]
fn test_missing_optional_file_stays_none() {
    let form = FormData::new(KeyedValues::from_pairs([("title", "Cat")]), Vec::new());
    let request: UploadImageRequest =
        bind_from_form_data(&BindingSources::default(), form).unwrap();
    assert_eq!(request.title.as_deref(), Some("Cat"));
    assert!(request.image.is_none());
}

#[test]
fn test_file_list_takes_matching_names_only() {
    let form = FormData::new(
        KeyedValues::new(),
        vec![
            file("files", "a.txt", b"a"),
            file("other", "b.txt", b"b"),
            file("Files", "c.txt", b"c"),
        ],
    );
    let request: UploadMultipleRequest =
        bind_from_form_data(&BindingSources::default(), form).unwrap();
    let names: Vec<_> = request.files.iter().filter_map(|f| f.file_name()).collect();
    assert_eq!(names, vec!["a.txt", "c.txt"]);
    assert!(request.description.is_none());
}

#[test]
fn test_file_collection_takes_every_upload() {
    let form = FormData::new(
        KeyedValues::new(),
        vec![file("x", "a.txt", b"a"), file("y", "b.txt", b"bb")],
    );
    let request: UploadAnyRequest = bind_from_form_data(&BindingSources::default(), form).unwrap();
    assert_eq!(request.all.len(), 2);
    assert_eq!(request.all.get_file("y").map(|f| f.len()), Some(2));
}

#[test]
fn test_form_field_precedence() {
    let sources = BindingSources::new(
        KeyedValues::from_pairs([("id", "1")]),
        KeyedValues::from_pairs([("id", "3"), ("comment", "from query")]),
    );
    let form = FormData::new(
        KeyedValues::from_pairs([("id", "2"), ("comment", "from form")]),
        Vec::new(),
    );
    let request: CommentRequest = bind_from_form_data(&sources, form).unwrap();
    assert_eq!(request.id, 1);
    assert_eq!(request.comment, "from form");

    let sources = BindingSources::new(
        KeyedValues::from_pairs([("id", "1")]),
        KeyedValues::from_pairs([("comment", "from query")]),
    );
    let request: CommentRequest = bind_from_form_data(&sources, FormData::default()).unwrap();
    assert_eq!(request.comment, "from query");
}

#[test]
fn test_invalid_form_value_is_a_field_error() {
    let form = FormData::new(KeyedValues::from_pairs([("id", "x"), ("comment", "c")]), Vec::new());
    let err = bind_from_form_data::<CommentRequest>(&BindingSources::default(), form).unwrap_err();
    assert_eq!(err.messages("id").unwrap(), &["'x' is not a valid i32".to_string()]);
}

#[tokio::test]
async fn test_buffered_multipart_keeps_small_files_in_memory() {
    let request = multipart_request(&[
        Part::Text("title", "Holiday"),
        Part::File("image", "beach.png", "image/png", b"\x89PNG data"),
    ]);
    let options = FormReadOptions::default();
    let form = read_form(request, &options).await.unwrap();

    let bound: UploadImageRequest = bind_from_form_data(&BindingSources::default(), form).unwrap();
    assert_eq!(bound.title.as_deref(), Some("Holiday"));

    let image = bound.image.unwrap();
    assert_eq!(image.name(), "image");
    assert_eq!(image.file_name(), Some("beach.png"));
    assert_eq!(image.content_type(), Some("image/png"));
    assert!(image.is_in_memory());
    assert_eq!(&image.bytes().await.unwrap()[..], b"\x89PNG data");
}

#[tokio::test]
async fn test_empty_file_input_leaves_field_unset() {
    let request = multipart_request(&[
        Part::Text("title", "No picture"),
        Part::File("image", "", "application/octet-stream", b""),
    ]);
    let form = read_form(request, &FormReadOptions::default()).await.unwrap();
    assert!(form.files.is_empty());

    let bound: UploadImageRequest = bind_from_form_data(&BindingSources::default(), form).unwrap();
    assert_eq!(bound.title.as_deref(), Some("No picture"));
    assert!(bound.image.is_none());
}

#[tokio::test]
async fn test_named_empty_file_is_still_bound() {
    let request = multipart_request(&[Part::File("image", "blank.png", "image/png", b"")]);
    let form = read_form(request, &FormReadOptions::default()).await.unwrap();

    let bound: UploadImageRequest = bind_from_form_data(&BindingSources::default(), form).unwrap();
    let image = bound.image.unwrap();
    assert_eq!(image.file_name(), Some("blank.png"));
    assert!(image.is_empty());
}

#[tokio::test]
async fn test_buffered_multipart_spills_past_threshold() {
    let payload = vec![7u8; 4096];
    let request = multipart_request(&[Part::File("image", "big.bin", "application/octet-stream", &payload)]);
    let options = FormReadOptions::new(
        FormOptions {
            memory_buffer_threshold: 1024,
            ..FormOptions::default()
        },
        FileBindingMode::Buffered,
    );
    let form = read_form(request, &options).await.unwrap();
    let bound: UploadImageRequest = bind_from_form_data(&BindingSources::default(), form).unwrap();

    let image = bound.image.unwrap();
    assert!(!image.is_in_memory());
    assert_eq!(image.len(), 4096);
    assert_eq!(image.bytes().await.unwrap().len(), 4096);
}

#[tokio::test]
async fn test_streaming_mode_spools_every_file() {
    let request = multipart_request(&[Part::File("video", "clip.mp4", "video/mp4", b"tiny")]);
    let options = FormReadOptions::new(FormOptions::default(), FileBindingMode::Streaming);
    let bound: StreamUploadRequest = bind_from_form(
        &BindingSources::default(),
        PendingForm::from_request(request).await.unwrap(),
        &options,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let video = bound.video.unwrap();
    assert_eq!(video.file_name(), Some("clip.mp4"));
    assert_eq!(video.len(), 4);

    let mut contents = Vec::new();
    let mut stream = video.open().await.unwrap();
    tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut contents)
        .await
        .unwrap();
    assert_eq!(contents, b"tiny");
}

#[tokio::test]
async fn test_urlencoded_form() {
    let request = Request::builder()
        .method("POST")
        .uri("/comments/4")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("comment=hello+there&id=9"))
        .unwrap();
    let sources = BindingSources::new(KeyedValues::from_pairs([("id", "4")]), KeyedValues::new());
    let bound: CommentRequest = bind_from_form(
        &sources,
        PendingForm::from_request(request).await.unwrap(),
        &FormReadOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(bound.id, 4);
    assert_eq!(bound.comment, "hello there");
}

#[tokio::test]
async fn test_form_over_limit_is_payload_too_large() {
    let payload = vec![1u8; 512];
    let request = multipart_request(&[Part::File("image", "big.bin", "application/octet-stream", &payload)]);
    let options = FormReadOptions::new(
        FormOptions {
            multipart_body_length_limit: 100,
            ..FormOptions::default()
        },
        FileBindingMode::Buffered,
    );
    let err = read_form(request, &options).await.unwrap_err();
    assert!(matches!(err, FennecError::PayloadTooLarge(_)));
}

#[tokio::test]
async fn test_cancelled_read_stops() {
    let request = multipart_request(&[Part::Text("title", "x")]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = PendingForm::from_request(request)
        .await
        .unwrap()
        .read(&FormReadOptions::default(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, FennecError::Cancelled));
}

#[tokio::test]
async fn test_request_without_form_content_type_reads_empty() {
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .body(Body::from("ignored"))
        .unwrap();
    let form = read_form(request, &FormReadOptions::default()).await.unwrap();
    assert!(form.fields.is_empty());
    assert!(form.files.is_empty());
}
