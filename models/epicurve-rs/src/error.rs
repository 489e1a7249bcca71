use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
    #[error("invalid Butcher tableau: {0}")]
    InvalidTableau(String),
    #[error(transparent)]
    Mrp(#[from] mrp::MrpError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn ensure(condition: bool, err: impl FnOnce() -> Error) -> Result<()> {
    if condition { Ok(()) } else { Err(err()) }
}
