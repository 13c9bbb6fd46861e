/// Errors that can occur in a single bus transaction.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// An I/O error occurred on the underlying transport.
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device side of the bus went away mid-transaction.
    #[error("bus device detached")]
    Detached,
}

pub type Result<T> = std::result::Result<T, BusError>;
