use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::extractors::AuthenticatedUser;
use crate::auth::token::{bearer_token, TokenService};

/// Endpoints under the API scope that are reachable without a bearer token.
const PUBLIC_PATHS: [&str; 3] = [
    "/api/v1/users/register",
    "/api/v1/users/login",
    "/api/v1/users/refresh",
];

/// Resolves the caller from `Authorization: Bearer <token>` before any
/// protected handler runs, and answers 401 otherwise. The rejection is a
/// regular response so outer middleware (CORS, logging) still sees it.
pub struct AuthMiddleware {
    tokens: Rc<TokenService>,
}

impl AuthMiddleware {
    pub fn new(tokens: TokenService) -> Self {
        Self {
            tokens: Rc::new(tokens),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            tokens: Rc::clone(&self.tokens),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    tokens: Rc<TokenService>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if PUBLIC_PATHS.contains(&req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let caller = bearer_token(header).and_then(|token| self.tokens.verify(token));

        match caller {
            Ok(user_id) => {
                req.extensions_mut().insert(AuthenticatedUser(user_id));
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(app_err) => {
                log::debug!("rejected {} {}: {}", req.method(), req.path(), app_err);
                let response = req.into_response(app_err.error_response());
                Box::pin(async move { Ok(response.map_into_right_body()) })
            }
        }
    }
}
