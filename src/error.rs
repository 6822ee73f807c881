//! Error types shared by the content source, renderer and comment sink

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("content source unreachable: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("content source answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unexpected document shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid image reference `{0}`")]
    InvalidImageRef(String),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
