use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::fmt;
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    LoginError(String),
    ApiError(String),
    InvalidResponse(String, String),
    TokenError(String),
    FormatError,
    InternalError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LoginError(s) => write!(f, "login failed: {}", s),
            Error::ApiError(s) => write!(f, "API request failed: {}", s),
            Error::InvalidResponse(body, reason) => {
                write!(f, "invalid API response ({}): {}", reason, body)
            }
            Error::TokenError(s) => write!(f, "unable to decode token: {}", s),
            Error::FormatError => write!(f, "unable to format output"),
            Error::InternalError => write!(f, "internal error"),
        }
    }
}

impl std::error::Error for Error {}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Error::LoginError(s) | Error::TokenError(s) => {
                let error = format!("<html><body><h3>403 Forbidden</h3>Error while authenticating to downstream API: <code>{}</code></body></html>", s);
                Response::build()
                    .status(Status::Forbidden)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
            Error::ApiError(s) => {
                let error = format!("<html><body><h3>502 Bad Gateway</h3>Downstream API error: <code>{}</code></body></html>", s);
                Response::build()
                    .status(Status::BadGateway)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
            _ => {
                let error = format!(
                    "<html><body><h3>Unknown exception</h3><code>{:?}</code></body></html>",
                    self
                );
                Response::build()
                    .status(Status::InternalServerError)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
        }
    }
}
