// src/error.rs
use crate::pages;
use log::error;
use std::convert::Infallible;
use std::fmt;
use warp::http::{StatusCode, Uri};
use warp::reject::Reject;
use warp::{Rejection, Reply};

/// Every user-facing failure becomes one of these: a message plus the
/// status code it should be served with.
#[derive(Debug)]
pub struct Apology {
    pub message: String,
    pub code: StatusCode,
}

impl fmt::Display for Apology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code.as_u16(), self.message)
    }
}

impl Reject for Apology {}

pub fn apology(message: &str, code: StatusCode) -> Rejection {
    warp::reject::custom(Apology {
        message: message.to_string(),
        code,
    })
}

/// Request hit a gated route without a valid session.
#[derive(Debug)]
pub struct AuthRequired;

impl Reject for AuthRequired {}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if err.find::<AuthRequired>().is_some() {
        return Ok(warp::redirect::see_other(Uri::from_static("/login")).into_response());
    }

    let (message, code) = if let Some(apology) = err.find::<Apology>() {
        (apology.message.clone(), apology.code)
    } else if err.is_not_found() {
        ("not found".to_string(), StatusCode::NOT_FOUND)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ("method not allowed".to_string(), StatusCode::METHOD_NOT_ALLOWED)
    } else if err.find::<warp::body::BodyDeserializeError>().is_some() {
        ("bad request".to_string(), StatusCode::BAD_REQUEST)
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            "internal server error".to_string(),
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    };

    let page = pages::apology(&message, code);
    Ok(warp::reply::with_status(warp::reply::html(page), code).into_response())
}
