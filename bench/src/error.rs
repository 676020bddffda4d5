use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("Common error: {0}")]
    CommonError(#[from] telenode_common::error::Error),
    #[error("Connection error")]
    ConnectionError,
    #[error("IO error")]
    IoError,
}
