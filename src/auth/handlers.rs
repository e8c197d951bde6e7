use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, AppResult},
    model::{employee::EmpId, role::Role},
    models::{LoginReqDto, RegisterReq, TokenPair, TokenType},
    store,
};
use actix_web::{HttpRequest, HttpResponse, Responder, error::ErrorUnauthorized, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

/// Role a registration may create. Self sign-up yields an Employee login;
/// anything else needs an Admin caller, except the very first user.
fn permitted_role(requested: Option<u8>, caller: Option<&AuthUser>, first_user: bool) -> AppResult<Role> {
    let role = match requested {
        Some(id) => Role::from_id(id).ok_or_else(|| AppError::validation(format!("unknown role id {id}")))?,
        None => Role::Employee,
    };
    if role == Role::Employee || first_user || caller.is_some_and(|c| c.role == Role::Admin) {
        Ok(role)
    } else {
        Err(AppError::forbidden(format!("only an Admin can create {role} logins")))
    }
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Empty credentials or unknown employee"),
        (status = 403, description = "Role needs an Admin caller"),
        (status = 409, description = "Username or employee login already exists")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(user, caller, pool), fields(username = %user.username))]
pub async fn register(
    user: web::Json<RegisterReq>,
    caller: Option<AuthUser>,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let RegisterReq {
        username,
        password,
        role_id,
        empid,
    } = user.into_inner();
    let username = username.trim().to_lowercase();

    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("Username and password must not be empty").into());
    }

    let first_user = store::user::count(pool.get_ref()).await? == 0;
    let role = permitted_role(role_id, caller.as_ref(), first_user)?;

    let empid = match empid.as_deref() {
        Some(raw) => {
            let empid = EmpId::parse(raw)?;
            store::employee::require(pool.get_ref(), &empid).await?;
            Some(empid)
        }
        None => None,
    };

    if store::user::username_taken(pool.get_ref(), &username).await? {
        return Err(AppError::conflict("Username already taken").into());
    }

    let hashed = hash_password(&password).map_err(|e| AppError::internal(format!("password hashing failed: {e}")))?;
    let user_id = store::user::insert(pool.get_ref(), &username, &hashed, role.id(), empid.as_ref()).await?;

    info!(user_id, %role, "User registered");
    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully"
    })))
}

fn issue_pair(subject: &TokenSubject, config: &Config) -> AppResult<(TokenPair, String, usize)> {
    let access_token = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| AppError::internal(format!("token signing failed: {e}")))?;
    let (refresh_token, refresh_claims) = generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
        .map_err(|e| AppError::internal(format!("token signing failed: {e}")))?;

    Ok((
        TokenPair {
            access_token,
            refresh_token,
        },
        refresh_claims.jti,
        refresh_claims.exp,
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    let username = user.username.trim().to_lowercase();
    if username.is_empty() || user.password.is_empty() {
        return Err(AppError::validation("Username or password required").into());
    }

    let db_user = match store::user::find_by_username(pool.get_ref(), &username).await? {
        Some(u) if u.is_active => u,
        Some(_) => {
            info!("Invalid credentials: user inactive");
            return Err(ErrorUnauthorized("Invalid credentials"));
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(ErrorUnauthorized("Invalid credentials"));
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ErrorUnauthorized("Invalid credentials"));
    }
    debug!(user_id = db_user.id, "Password verified");

    let subject = TokenSubject::from(&db_user);
    let (pair, jti, exp) = issue_pair(&subject, &config)?;
    store::user::store_refresh(pool.get_ref(), db_user.id, &jti, exp).await?;

    if let Err(e) = store::user::touch_login(pool.get_ref(), db_user.id).await {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let token = bearer(&req).ok_or_else(|| ErrorUnauthorized("No token"))?;
    let claims = verify_token(token, &config.jwt_secret).map_err(ErrorUnauthorized)?;
    if claims.token_type != TokenType::Refresh {
        return Err(ErrorUnauthorized("Refresh token required"));
    }

    // Rotation: the presented token is single-use.
    if !store::user::revoke_refresh(pool.get_ref(), &claims.jti).await? {
        info!(user_id = claims.user_id, "Refresh token unknown or already revoked");
        return Err(ErrorUnauthorized("Refresh token revoked"));
    }

    let subject = TokenSubject::from(&claims);
    let (pair, jti, exp) = issue_pair(&subject, &config)?;
    store::user::store_refresh(pool.get_ref(), claims.user_id, &jti, exp).await?;

    Ok(HttpResponse::Ok().json(pair))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(req: HttpRequest, pool: web::Data<MySqlPool>, config: web::Data<Config>) -> impl Responder {
    let claims = match bearer(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = store::user::revoke_refresh(pool.get_ref(), &claims.jti).await {
        error!(error = %e, "Failed to revoke refresh token");
    }
    HttpResponse::NoContent().finish()
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub user_id: u64,
    pub username: String,
    pub role: String,
    pub empid: Option<String>,
    pub capabilities: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Caller identity and capabilities", body = MeResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> impl Responder {
    let mut capabilities: Vec<String> = auth.capabilities.iter().map(ToString::to_string).collect();
    capabilities.sort();

    HttpResponse::Ok().json(MeResponse {
        user_id: auth.user_id,
        username: auth.username,
        role: auth.role.to_string(),
        empid: auth.empid.map(|e| e.to_string()),
        capabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::capability::RoleCapabilities;
    use actix_web::{App, test as atest, web::Data};

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "boss".into(),
            role,
            empid: None,
            capabilities: RoleCapabilities::default().for_role(role),
        }
    }

    #[test]
    fn self_signup_is_employee_only() {
        assert_eq!(permitted_role(None, None, false).unwrap(), Role::Employee);
        assert_eq!(permitted_role(Some(3), None, false).unwrap(), Role::Employee);
        assert!(matches!(permitted_role(Some(2), None, false), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn admin_creates_any_role() {
        let admin = caller(Role::Admin);
        assert_eq!(permitted_role(Some(4), Some(&admin), false).unwrap(), Role::Manager);
        let hr = caller(Role::Hr);
        assert!(permitted_role(Some(1), Some(&hr), false).is_err());
    }

    #[test]
    fn first_user_bootstraps_an_admin() {
        assert_eq!(permitted_role(Some(1), None, true).unwrap(), Role::Admin);
        assert!(matches!(permitted_role(Some(9), None, true), Err(AppError::Validation(_))));
    }

    #[actix_web::test]
    async fn me_reports_token_identity() {
        let config = Config::for_tests();
        let subject = TokenSubject {
            user_id: 9,
            username: "asha".into(),
            role: Role::Manager.id(),
            empid: Some("2000".into()),
        };
        let token = generate_access_token(&subject, &config.jwt_secret, 60).unwrap();
        let app = atest::init_service(App::new().app_data(Data::new(config)).route("/me", web::get().to(me))).await;

        let req = atest::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body: serde_json::Value = atest::call_and_read_body_json(&app, req).await;

        assert_eq!(body["username"], "asha");
        assert_eq!(body["role"], "Manager");
        assert_eq!(body["empid"], "2000");
        assert_eq!(body["capabilities"], json!(["LeaveApprover", "SelfReader"]));
    }

    #[actix_web::test]
    async fn me_without_token_is_unauthorized() {
        let app = atest::init_service(
            App::new()
                .app_data(Data::new(Config::for_tests()))
                .route("/me", web::get().to(me)),
        )
        .await;

        let resp = atest::call_service(&app, atest::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }
}
