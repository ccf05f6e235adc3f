use std::future::{Ready, ready};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    error::{ErrorInternalServerError, ErrorUnauthorized},
    http::header,
    web,
};
use futures_util::future::LocalBoxFuture;

use crate::state::app_state::AppState;
use crate::utils::jwt::validate_token;

/// Requires a bearer token from the account service and stores its `Claims`
/// in the request extensions.
pub struct JwtAuth;

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware { service }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let secret = match req.app_data::<web::Data<AppState>>() {
            Some(state) => state.config.jwt_secret.clone(),
            None => {
                return Box::pin(async move { Err(ErrorInternalServerError("App state missing")) });
            }
        };

        // Get token from Authorization header
        let auth_header_str = match req
            .headers()
            .get(header::AUTHORIZATION)
            .map(|h| h.to_str())
        {
            Some(Ok(header_str)) => header_str,
            Some(Err(_)) => {
                return Box::pin(
                    async move { Err(ErrorUnauthorized("Invalid authorization header")) },
                );
            }
            None => {
                return Box::pin(async move { Err(ErrorUnauthorized("No authorization header")) });
            }
        };

        let Some(token) = auth_header_str.strip_prefix("Bearer ") else {
            return Box::pin(async move { Err(ErrorUnauthorized("Invalid authorization format")) });
        };

        let claims = match validate_token(token, &secret) {
            Ok(claims) => claims,
            Err(e) => {
                log::debug!("Rejected token: {:#}", e);
                return Box::pin(async move { Err(ErrorUnauthorized("Invalid token")) });
            }
        };

        // Store claims in request extensions for later use
        req.extensions_mut().insert(claims);

        Box::pin(self.service.call(req))
    }
}
