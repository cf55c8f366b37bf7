use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Docker connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    #[error("Docker operation '{operation}' timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },
    #[error("SSH tunnel failed: {0}")]
    Tunnel(String),
    #[error("Bollard error: {0}")]
    BollardError(#[from] bollard::errors::Error),
}

impl RuntimeError {
    /// Maps a bollard error for a container-scoped call, turning 404 into
    /// [`RuntimeError::ContainerNotFound`].
    pub fn for_container(err: bollard::errors::Error, container_id: &str) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError { status_code: 404, .. } => {
                RuntimeError::ContainerNotFound(container_id.to_string())
            }
            other => RuntimeError::BollardError(other),
        }
    }
}
