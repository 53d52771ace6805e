use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::fmt;
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// API answered with `success: false`; carries the server `exception` message.
    RemoteRejection(String),
    /// Request could not be completed or the server answered with a non-2xx status.
    TransportFailure(String),
    RateExceeded(String),
    /// Response body, followed by the parse error.
    InvalidResponse(String, String),
    FormatError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RemoteRejection(s) => write!(f, "SolaxCloud rejected the request: {}", s),
            Error::TransportFailure(s) => write!(f, "Unable to reach SolaxCloud: {}", s),
            Error::RateExceeded(s) => write!(f, "SolaxCloud rate limit exceeded: {}", s),
            Error::InvalidResponse(body, e) => {
                write!(f, "Invalid SolaxCloud response ({}): {}", e, body)
            }
            Error::FormatError => write!(f, "Unable to format metrics"),
        }
    }
}

impl std::error::Error for Error {}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let error = format!(
            "<html><body><h3>Internal error</h3><code>{}</code></body></html>",
            self
        );
        Response::build()
            .status(Status::InternalServerError)
            .sized_body(error.len(), Cursor::new(error))
            .header(ContentType::new("text", "html"))
            .ok()
    }
}
