//! Reading multipart and urlencoded form bodies.

use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{StatusCode, header};
use bytes::{Bytes, BytesMut};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::binding::files::FormFile;
use crate::binding::sources::{FormData, KeyedValues};
use crate::config::{FileBindingMode, FormOptions};
use crate::error::FennecError;

/// Limits and file mode for one form read.
#[derive(Debug, Clone, Default)]
pub struct FormReadOptions {
    pub limits: FormOptions,
    pub mode: FileBindingMode,
}

impl FormReadOptions {
    pub fn new(limits: FormOptions, mode: FileBindingMode) -> Self {
        FormReadOptions { limits, mode }
    }
}

/// A form body that has not been read yet.
pub enum PendingForm {
    Multipart(Multipart),
    UrlEncoded(Body),
    /// The request carries no form content type.
    Empty,
}

impl PendingForm {
    /// Classify the request by content type.
    ///
    /// The request keeps its extensions so the host's body limit applies
    /// to the multipart reader.
    pub async fn from_request(req: Request) -> Result<Self, FennecError> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, &())
                .await
                .map_err(|e| FennecError::BadRequest(e.body_text()))?;
            Ok(PendingForm::Multipart(multipart))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            Ok(PendingForm::UrlEncoded(req.into_body()))
        } else {
            Ok(PendingForm::Empty)
        }
    }

    /// Read the whole form, giving up as soon as `cancel` fires.
    pub async fn read(
        self,
        options: &FormReadOptions,
        cancel: &CancellationToken,
    ) -> Result<FormData, FennecError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FennecError::Cancelled),
            result = self.read_to_end(options) => result,
        }
    }

    async fn read_to_end(self, options: &FormReadOptions) -> Result<FormData, FennecError> {
        match self {
            PendingForm::Multipart(multipart) => read_multipart(multipart, options).await,
            PendingForm::UrlEncoded(body) => {
                let limit = options.limits.multipart_body_length_limit;
                let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
                    if is_length_limit(&e) {
                        too_large(limit)
                    } else {
                        FennecError::BadRequest(format!("Failed to read form body: {}", e))
                    }
                })?;
                let raw = std::str::from_utf8(&bytes)
                    .map_err(|_| FennecError::BadRequest("Form body is not valid UTF-8".into()))?;
                Ok(FormData::new(KeyedValues::parse_urlencoded(raw), Vec::new()))
            }
            PendingForm::Empty => Ok(FormData::default()),
        }
    }
}

pub(crate) fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = source {
        if current.to_string().contains("length limit") {
            return true;
        }
        source = current.source();
    }
    false
}

fn too_large(limit: usize) -> FennecError {
    FennecError::PayloadTooLarge(format!("Form body exceeds the {} byte limit", limit))
}

fn multipart_error(err: MultipartError) -> FennecError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FennecError::PayloadTooLarge(err.body_text())
    } else {
        FennecError::BadRequest(err.body_text())
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    options: &FormReadOptions,
) -> Result<FormData, FennecError> {
    let limit = options.limits.multipart_body_length_limit;
    let mut total = 0usize;
    let mut fields = KeyedValues::new();
    let mut files = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        if file_name.is_none() {
            let text = field.text().await.map_err(multipart_error)?;
            total += text.len();
            if total > limit {
                return Err(too_large(limit));
            }
            fields.insert(name, text);
            continue;
        }

        let mut sink = FileSink::new(options);
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            total += chunk.len();
            if total > limit {
                return Err(too_large(limit));
            }
            sink.write(chunk).await?;
        }
        // An empty file input still posts a part, with `filename=""`.
        if sink.len == 0 && file_name.as_deref() == Some("") {
            continue;
        }
        files.push(sink.finish(name, file_name, content_type).await?);
    }

    tracing::trace!(fields = fields.len(), files = files.len(), bytes = total, "form read");
    Ok(FormData::new(fields, files))
}

/// Accumulates one uploaded file in memory, spilling to disk past the
/// buffer threshold (always on disk in streaming mode).
struct FileSink<'a> {
    options: &'a FormReadOptions,
    buffer: BytesMut,
    disk: Option<(tokio::fs::File, tempfile::TempPath)>,
    len: u64,
}

impl<'a> FileSink<'a> {
    fn new(options: &'a FormReadOptions) -> Self {
        FileSink {
            options,
            buffer: BytesMut::new(),
            disk: None,
            len: 0,
        }
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), FennecError> {
        self.len += chunk.len() as u64;
        if chunk.is_empty() {
            return Ok(());
        }
        let spill = self.options.mode == FileBindingMode::Streaming
            || self.buffer.len() + chunk.len() > self.options.limits.memory_buffer_threshold;

        if self.disk.is_none() && spill {
            let named = match &self.options.limits.temp_dir {
                Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
                None => tempfile::NamedTempFile::new()?,
            };
            let (file, path) = named.into_parts();
            let mut file = tokio::fs::File::from_std(file);
            file.write_all(&self.buffer).await?;
            self.buffer.clear();
            self.disk = Some((file, path));
        }

        match &mut self.disk {
            Some((file, _)) => file.write_all(&chunk).await?,
            None => self.buffer.extend_from_slice(&chunk),
        }
        Ok(())
    }

    async fn finish(
        self,
        name: String,
        file_name: Option<String>,
        content_type: Option<String>,
    ) -> Result<FormFile, FennecError> {
        match self.disk {
            Some((mut file, path)) => {
                file.flush().await?;
                Ok(FormFile::spooled(name, file_name, content_type, self.len, path))
            }
            None => Ok(FormFile::from_bytes(
                name,
                file_name,
                content_type,
                self.buffer.freeze(),
            )),
        }
    }
}
