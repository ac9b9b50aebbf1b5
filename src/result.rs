use std::fmt::Display;

use miette::miette;

#[derive(Debug)]
pub enum Error {
    /// The record's source URL could not be turned into a usable audio
    /// stream. Recoverable: the record is skipped, the run goes on.
    Unresolvable(String),

    Miette(miette::Report),
}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::Unresolvable(reason) => miette!("Unresolvable stream: {reason}"),
            Error::Miette(err) => err,
        }
    }
}

impl Error {
    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            err => err,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
