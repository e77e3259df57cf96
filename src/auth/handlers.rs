use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        auth::{AuthUser, bearer_token},
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::ApiError,
    model::user::{User, default_department},
    models::{AuthResponse, LoginRequest, RegisterRequest, TokenType},
    store::UserRepository,
    utils::{email_cache, email_filter},
};

fn issue_tokens(user: &User, config: &Config) -> Result<AuthResponse, ApiError> {
    let token = generate_access_token(user, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, _) =
        generate_refresh_token(user, &config.jwt_secret, config.refresh_token_ttl)?;

    Ok(AuthResponse {
        token,
        refresh_token,
        user: user.profile(),
    })
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, users: &dyn UserRepository) -> Result<bool, ApiError> {
    // cuckoo filter: a miss is definitive
    if !email_filter::might_exist(email) {
        return Ok(true);
    }

    // moka cache: a hit is definitive
    if email_cache::is_taken(email).await {
        return Ok(false);
    }

    let exists = users.find_user_by_email(email).await?.is_some();
    if exists {
        email_cache::mark_taken(email).await;
    }
    Ok(!exists)
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = Object, example = json!({
            "message": "Invalid credentials"
        })),
        (status = 429, description = "Too many requests")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(users, config, body),
    fields(email = %body.email)
)]
pub async fn login(
    body: web::Json<LoginRequest>,
    users: web::Data<dyn UserRepository>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if body.email.trim().is_empty() || body.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    let user = match users.find_user_by_email(body.email.trim()).await? {
        Some(user) => {
            debug!(user_id = %user.id, "User found");
            user
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(ApiError::bad_request("Invalid credentials"));
        }
    };

    if let Err(e) = verify_password(&body.password, &user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    let response = issue_tokens(&user, &config)?;

    info!(user_id = %user.id, "Login successful");
    Ok(HttpResponse::Ok().json(response))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered and logged in", body = AuthResponse),
        (status = 400, description = "User already exists", body = Object, example = json!({
            "message": "User already exists"
        })),
        (status = 429, description = "Too many requests")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_register",
    skip(users, config, body),
    fields(email = %body.email)
)]
pub async fn register(
    body: web::Json<RegisterRequest>,
    users: web::Data<dyn UserRepository>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let name = body.name.trim();
    let email = body.email.trim();

    if name.is_empty() || email.is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Name, email and password are required"));
    }

    if !is_email_available(email, users.get_ref()).await? {
        info!("Registration rejected: email taken");
        return Err(ApiError::bad_request("User already exists"));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password: hash_password(&body.password)?,
        role: body.role.unwrap_or_default(),
        employee_id: body.employee_id.filter(|e| !e.trim().is_empty()),
        department: body
            .department
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(default_department),
    };

    // the store enforces uniqueness again for concurrent registrations
    users.insert_user(&user).await?;
    email_filter::insert(&user.email);
    email_cache::mark_taken(&user.email).await;

    let response = issue_tokens(&user, &config)?;

    info!(user_id = %user.id, role = %user.role, "User registered");
    Ok(HttpResponse::Ok().json(response))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New tokens", body = AuthResponse),
        (status = 401, description = "Missing, invalid or non-refresh token")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    req: HttpRequest,
    users: web::Data<dyn UserRepository>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::unauthorized("No token, authorization denied"))?;

    let claims = verify_token(token, &config.jwt_secret).map_err(|e| {
        debug!(error = %e, "Refresh token rejected");
        ApiError::unauthorized("Token is not valid")
    })?;

    if claims.token_type != TokenType::Refresh {
        warn!(user_id = %claims.user_id, "Access token presented for refresh");
        return Err(ApiError::unauthorized("Token is not valid"));
    }

    // reload so the new tokens carry the current role
    let user = users.find_user(&claims.user_id).await?.ok_or_else(|| {
        warn!(user_id = %claims.user_id, "Refresh for a user that no longer exists");
        ApiError::unauthorized("Token is not valid")
    })?;

    let response = issue_tokens(&user, &config)?;
    debug!(user_id = %user.id, "Tokens refreshed");
    Ok(HttpResponse::Ok().json(response))
}

/// The logged-in user's profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn me(
    auth: AuthUser,
    users: web::Data<dyn UserRepository>,
) -> Result<HttpResponse, ApiError> {
    match users.find_user(&auth.user_id).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user.profile())),
        None => {
            error!(user_id = %auth.user_id, "Authenticated user missing from store");
            Err(ApiError::not_found("User not found"))
        }
    }
}
