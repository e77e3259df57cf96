use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header::HeaderMap, web::Data};
use futures::future::{Ready, ready};

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};

/// The caller behind a valid access token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

/// The token after `Bearer ` in the Authorization header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl AuthUser {
    /// Only access tokens authenticate requests.
    pub fn from_claims(claims: Claims) -> Result<Self, ApiError> {
        if claims.token_type != TokenType::Access {
            return Err(ApiError::unauthorized("Token is not valid"));
        }
        Ok(Self {
            user_id: claims.user_id,
            email: claims.sub,
            role: claims.role,
        })
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn require_manager(&self) -> Result<(), ApiError> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Manager only"))
        }
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    if let Some(user) = req.extensions().get::<AuthUser>() {
        return Ok(user.clone());
    }

    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::unauthorized("No token, authorization denied"))?;

    let config = req.app_data::<Data<Config>>().ok_or(ApiError::Internal)?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::unauthorized("Token is not valid"))?;

    AuthUser::from_claims(claims)
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn claims(token_type: TokenType, role: Role) -> Claims {
        Claims {
            user_id: "2".into(),
            sub: "employee1@company.com".into(),
            role,
            exp: usize::MAX,
            jti: "j".into(),
            token_type,
        }
    }

    #[test]
    fn refresh_claims_do_not_authenticate() {
        assert!(AuthUser::from_claims(claims(TokenType::Refresh, Role::Employee)).is_err());
        let user = AuthUser::from_claims(claims(TokenType::Access, Role::Employee)).unwrap();
        assert_eq!(user.user_id, "2");
        assert!(user.require_manager().is_err());
    }

    #[test]
    fn reads_bearer_tokens() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def"))
            .to_http_request();
        assert_eq!(bearer_token(req.headers()), Some("abc.def"));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic abc"))
            .to_http_request();
        assert_eq!(bearer_token(req.headers()), None);
    }

    #[test]
    fn extracted_user_prefers_middleware_extensions() {
        let req = TestRequest::default().to_http_request();
        let user = AuthUser::from_claims(claims(TokenType::Access, Role::Manager)).unwrap();
        req.extensions_mut().insert(user.clone());
        assert_eq!(authenticate(&req).unwrap(), user);
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(authenticate(&req), Err(ApiError::Unauthorized(_))));
    }
}
