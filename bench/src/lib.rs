pub mod error;
pub mod hw;

pub type Result<T> = std::result::Result<T, error::Error>;
