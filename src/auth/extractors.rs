use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;

/// The caller's resolved identity.
///
/// Inserted into request extensions by `AuthMiddleware` after the bearer token
/// verified; handlers take it as an argument. If it is missing the middleware
/// did not run for this route, and the request is rejected with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().copied() {
            Some(user) => ready(Ok(user)),
            None => {
                let err = AppError::Unauthorized("You are not authorized".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
