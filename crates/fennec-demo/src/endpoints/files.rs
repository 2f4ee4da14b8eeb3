use fennec_core::prelude::*;
use uuid::Uuid;

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];
const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;
const MAX_FILES: usize = 10;

fn has_image_extension(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Checks shared by the image endpoints; `Err` carries the client message.
fn check_image(file: Option<&FormFile>) -> Result<&FormFile, String> {
    let file = match file {
        Some(file) if !file.is_empty() => file,
        _ => return Err("File is required".to_string()),
    };
    if !has_image_extension(file.file_name().unwrap_or_default()) {
        return Err(format!(
            "Invalid file type. Allowed types: {}",
            IMAGE_EXTENSIONS.join(", ")
        ));
    }
    if file.len() > MAX_IMAGE_SIZE {
        return Err("File size exceeds 5MB limit".to_string());
    }
    Ok(file)
}

// ── Single image ───────────────────────────────────────────────

#[derive(Debug, BindRequest)]
pub struct UploadImageRequest {
    pub file: Option<FormFile>,
    #[bind(from_form)]
    pub description: Option<String>,
}

#[derive(Injectable)]
pub struct UploadImage;

#[async_trait]
impl Endpoint for UploadImage {
    type Request = UploadImageRequest;
    type Response = ();

    fn configure(route: &mut RouteConfig) {
        route
            .post("/images/upload")
            .tags(["Images"])
            .allow_file_uploads()
            .produces(204)
            .produces_problem(400);
    }

    async fn handle(
        &self,
        request: UploadImageRequest,
        _cx: HandlerContext,
        send: Responder<()>,
    ) -> Result<Sent, FennecError> {
        let file = match check_image(request.file.as_ref()) {
            Ok(file) => file,
            Err(message) => return Ok(send.bad_request(message)),
        };
        tracing::info!(
            file_name = file.file_name().unwrap_or_default(),
            content_type = file.content_type().unwrap_or_default(),
            size = file.len(),
            description = request.description.as_deref().unwrap_or("(no description)"),
            "received image upload"
        );
        Ok(send.no_content())
    }
}

// ── Image for a moment ─────────────────────────────────────────

#[derive(Debug, BindRequest)]
pub struct AddImageRequest {
    pub moment_id: Uuid,
    pub file: Option<FormFile>,
}

#[derive(Injectable)]
pub struct AddImageToMoment;

#[async_trait]
impl Endpoint for AddImageToMoment {
    type Request = AddImageRequest;
    type Response = ();

    fn configure(route: &mut RouteConfig) {
        route
            .post("/image/moment/{moment_id:guid}")
            .name("AddImage")
            .tags(["Images"])
            .allow_anonymous()
            .allow_file_uploads()
            .produces(204)
            .produces_problem(400);
    }

    async fn handle(
        &self,
        request: AddImageRequest,
        _cx: HandlerContext,
        send: Responder<()>,
    ) -> Result<Sent, FennecError> {
        if request.moment_id.is_nil() {
            return Ok(send.bad_request("Invalid MomentId"));
        }
        let file = match check_image(request.file.as_ref()) {
            Ok(file) => file,
            Err(message) => return Ok(send.bad_request(message)),
        };
        tracing::info!(
            moment_id = %request.moment_id,
            file_name = file.file_name().unwrap_or_default(),
            size = file.len(),
            "added image to moment"
        );
        Ok(send.no_content())
    }
}

// ── Many files ─────────────────────────────────────────────────

#[derive(Debug, BindRequest)]
pub struct UploadMultipleFilesRequest {
    pub files: Vec<FormFile>,
    #[bind(from_form)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct UploadMultipleFilesResponse {
    pub count: usize,
    pub total_bytes: u64,
    pub category: Option<String>,
    pub files: Vec<UploadedFile>,
}

#[derive(Injectable)]
pub struct UploadMultipleFiles;

#[async_trait]
impl Endpoint for UploadMultipleFiles {
    type Request = UploadMultipleFilesRequest;
    type Response = UploadMultipleFilesResponse;

    fn configure(route: &mut RouteConfig) {
        route
            .post("/files/upload-multiple")
            .tags(["Files"])
            .allow_anonymous()
            .allow_file_uploads()
            .produces_type::<UploadMultipleFilesResponse>(200)
            .produces_problem(400);
    }

    async fn handle(
        &self,
        request: UploadMultipleFilesRequest,
        _cx: HandlerContext,
        send: Responder<UploadMultipleFilesResponse>,
    ) -> Result<Sent, FennecError> {
        tracing::info!(count = request.files.len(), "uploading files");
        if request.files.is_empty() {
            return Ok(send.bad_request("At least one file is required"));
        }
        if request.files.len() > MAX_FILES {
            return Ok(send.bad_request(format!("Maximum {MAX_FILES} files allowed")));
        }
        if let Some(empty) = request.files.iter().find(|f| f.is_empty()) {
            return Ok(send.bad_request(format!(
                "File {} is empty",
                empty.file_name().unwrap_or("(unnamed)")
            )));
        }

        let files: Vec<UploadedFile> = request
            .files
            .iter()
            .map(|f| UploadedFile {
                file_name: f.file_name().map(str::to_string),
                content_type: f.content_type().map(str::to_string),
                size: f.len(),
            })
            .collect();
        Ok(send.ok(UploadMultipleFilesResponse {
            count: files.len(),
            total_bytes: files.iter().map(|f| f.size).sum(),
            category: request.category,
            files,
        }))
    }
}

// ── Streamed video ─────────────────────────────────────────────

#[derive(Debug, BindRequest)]
pub struct UploadVideoRequest {
    pub id: Uuid,
    pub video: Option<StreamFile>,
}

#[derive(Debug, Serialize)]
pub struct UploadVideoResponse {
    pub id: Uuid,
    pub file_name: Option<String>,
    pub bytes: u64,
}

#[derive(Injectable)]
pub struct UploadVideo;

#[async_trait]
impl Endpoint for UploadVideo {
    type Request = UploadVideoRequest;
    type Response = UploadVideoResponse;

    fn configure(route: &mut RouteConfig) {
        route
            .post("/videos/{id:guid}")
            .name("StreamVideoUpload")
            .tags(["Files"])
            .allow_anonymous()
            .allow_file_uploads()
            .file_binding_mode(FileBindingMode::Streaming);
    }

    async fn handle(
        &self,
        request: UploadVideoRequest,
        cx: HandlerContext,
        send: Responder<UploadVideoResponse>,
    ) -> Result<Sent, FennecError> {
        let Some(video) = request.video else {
            return Ok(send.bad_request("Video file is required."));
        };

        let mut reader = video.open().await?;
        let mut sink = tokio::io::sink();
        let bytes = tokio::select! {
            copied = tokio::io::copy(&mut reader, &mut sink) => copied?,
            _ = cx.cancellation().cancelled() => return Err(FennecError::Cancelled),
        };
        Ok(send.ok(UploadVideoResponse {
            id: request.id,
            file_name: video.file_name().map(str::to_string),
            bytes,
        }))
    }
}
