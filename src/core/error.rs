use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// Malformed or contradictory request parameters.
    BadRequest(String),
    /// The requested log resource does not exist.
    NotFound(String),
}

impl Error {
    /// HTTP status equivalent of this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Io(_) => 500,
            Error::BadRequest(_) => 400,
            Error::NotFound(_) => 404,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::BadRequest(msg) => write!(f, "bad request: {msg}"),
            Error::NotFound(msg) => write!(f, "not found: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
