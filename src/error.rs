use derive_more::{Display, Error};

/// A top-level error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open the database")]
    Database,
    #[display("command failed")]
    Command {
        #[error(not(source))]
        retryable: bool,
    },
    #[display("could not write output")]
    Output,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Command { retryable: true })
    }

    #[track_caller]
    pub fn command(err: lexi_catalogue::error::Error) -> Error {
        let retryable = err.is_retryable();
        err.raise(Self::Command { retryable })
    }
}
