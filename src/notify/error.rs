use thiserror::Error;

pub type NotifyResult<T> = std::result::Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("smtp error: {0}")]
    SmtpError(#[from] lettre::transport::smtp::Error),
    #[error("address error: {0}")]
    AddressError(#[from] lettre::address::AddressError),
    #[error("message error: {0}")]
    MessageError(#[from] lettre::error::Error),
}
