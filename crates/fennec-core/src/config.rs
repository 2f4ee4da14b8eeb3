use std::path::PathBuf;

use serde::Deserialize;

/// Form reading limits.
///
/// Defaults: 64 KiB kept in memory per file, 20 MiB total multipart body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormOptions {
    /// Files larger than this are spooled to a temporary file (buffered mode).
    pub memory_buffer_threshold: usize,

    /// Maximum size of a whole multipart/urlencoded body in bytes.
    pub multipart_body_length_limit: usize,

    /// Directory for spooled uploads (default: the system temp dir).
    pub temp_dir: Option<PathBuf>,
}

impl Default for FormOptions {
    fn default() -> Self {
        FormOptions {
            memory_buffer_threshold: 64 * 1024,
            multipart_body_length_limit: 20 * 1024 * 1024,
            temp_dir: None,
        }
    }
}

/// How uploaded files are handed to the handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileBindingMode {
    /// Read files up front; small files stay in memory.
    #[default]
    Buffered,
    /// Spool every file to disk as it arrives and hand out lazy streams.
    Streaming,
}

impl FileBindingMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buffered" | "buffer" => Some(FileBindingMode::Buffered),
            "streaming" | "stream" => Some(FileBindingMode::Streaming),
            _ => None,
        }
    }
}

/// Framework settings, frozen once the application is built.
///
/// Shared by `Arc` with the binder and the dispatcher; nothing mutates it
/// after startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FennecSettings {
    /// Server host (default: 127.0.0.1)
    pub server_host: String,

    /// Server port (default: 3000)
    pub server_port: u16,

    /// Default form limits for endpoints that do not override them.
    pub form: FormOptions,

    /// Default file binding mode (default: buffered)
    pub file_binding_mode: FileBindingMode,

    /// Require an authenticated caller on every route that does not opt out.
    pub require_authorization: bool,

    /// Max JSON body size in bytes (default: 2MB)
    pub max_json_body_size: usize,

    /// Attach request-id and `TraceLayer` middleware to the router.
    pub trace_requests: bool,
}

impl Default for FennecSettings {
    fn default() -> Self {
        FennecSettings {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            form: FormOptions::default(),
            file_binding_mode: FileBindingMode::Buffered,
            require_authorization: false,
            max_json_body_size: 2 * 1024 * 1024,
            trace_requests: false,
        }
    }
}

impl FennecSettings {
    /// Load settings from environment variables (with .env support).
    pub fn from_env() -> Self {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unknown or malformed
    /// values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = FennecSettings::default();
        let number = |key: &str, fallback: usize| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(fallback)
        };
        let flag = |key: &str| {
            matches!(
                lookup(key).unwrap_or_default().to_lowercase().as_str(),
                "true" | "1" | "yes"
            )
        };

        FennecSettings {
            server_host: lookup("FENNEC_SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: lookup("FENNEC_SERVER_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.server_port),
            form: FormOptions {
                memory_buffer_threshold: number(
                    "FENNEC_FORM_MEMORY_THRESHOLD",
                    defaults.form.memory_buffer_threshold,
                ),
                multipart_body_length_limit: number(
                    "FENNEC_MULTIPART_BODY_LIMIT",
                    defaults.form.multipart_body_length_limit,
                ),
                temp_dir: lookup("FENNEC_UPLOAD_TEMP_DIR").map(PathBuf::from),
            },
            file_binding_mode: lookup("FENNEC_FILE_BINDING_MODE")
                .and_then(|v| FileBindingMode::parse(&v))
                .unwrap_or(defaults.file_binding_mode),
            require_authorization: flag("FENNEC_REQUIRE_AUTHORIZATION"),
            max_json_body_size: number("FENNEC_MAX_JSON_BODY", defaults.max_json_body_size),
            trace_requests: flag("FENNEC_TRACE_REQUESTS"),
        }
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
