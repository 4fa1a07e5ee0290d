//! Error types for the HTTP server.

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),

    /// The static file directory is unusable.
    #[error("public directory {path} is not a directory")]
    PublicDir {
        /// The configured path.
        path: String,
    },
}
