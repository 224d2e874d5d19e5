use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
