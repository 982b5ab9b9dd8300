//! Command-line Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Settings could not be loaded, or a flag contradicts them.
    #[display("configuration error")]
    Config,
    /// The log subscriber could not be installed.
    #[display("could not initialize logging")]
    Logging,
    #[display("cache operation failed")]
    Cache,
    /// Writing results to standard output failed.
    #[display("could not write output")]
    Output,
}
