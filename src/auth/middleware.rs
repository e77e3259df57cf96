use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::debug;

use crate::auth::auth::{AuthUser, bearer_token};
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;

/// Rejects requests without a valid access token and stores the caller as an
/// [`AuthUser`] request extension for the handlers.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or(ApiError::Internal)?;

    let verified = match bearer_token(req.headers()) {
        None => Err(ApiError::unauthorized("No token, authorization denied")),
        Some(token) => verify_token(token, &config.jwt_secret)
            .map_err(|e| {
                debug!(error = %e, "Rejected token");
                ApiError::unauthorized("Token is not valid")
            })
            .and_then(AuthUser::from_claims),
    };

    match verified {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(e) => {
            let resp = e.error_response();
            Ok(req.into_response(resp.map_into_boxed_body()))
        }
    }
}
