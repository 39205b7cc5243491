use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration: {0}")]
    Config(Box<figment::Error>),

    #[error("Tokenizer unavailable: {0}")]
    Tokenizer(String),

    #[error("Index unavailable: {0}")]
    Index(String),
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self { Error::Config(Box::new(e)) }
}

pub type Result<T> = std::result::Result<T, Error>;
