use std::collections::HashSet;

use crate::auth::capability::{Capability, ReadScope, RoleCapabilities};
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::{employee::EmpId, role::Role};
use crate::models::{Claims, TokenType};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest,
    dev::Payload,
    error::{ErrorInternalServerError, ErrorUnauthorized},
    web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub empid: Option<EmpId>,
    pub capabilities: HashSet<Capability>,
}

impl AuthUser {
    pub fn from_claims(claims: Claims, mapping: &RoleCapabilities) -> Result<Self, &'static str> {
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;
        let empid = match claims.empid.as_deref() {
            Some(raw) => Some(EmpId::parse(raw).map_err(|_| "Invalid empid claim")?),
            None => None,
        };

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            empid,
            capabilities: mapping.for_role(role),
        })
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("{capability} capability required")))
        }
    }

    /// The caller's own employee id, for self-service operations.
    pub fn require_empid(&self) -> AppResult<&EmpId> {
        self.empid
            .as_ref()
            .ok_or_else(|| AppError::forbidden("No employee profile"))
    }

    /// Summary/payslip rows this caller may read.
    pub fn read_scope(&self) -> AppResult<ReadScope> {
        if self.can(Capability::PayrollAdmin) {
            return Ok(ReadScope::Everything);
        }
        self.require(Capability::SelfReader)?;
        Ok(ReadScope::OwnFrozen(self.require_empid()?.clone()))
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by the auth middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ErrorInternalServerError("Config missing"))),
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        ready(AuthUser::from_claims(claims, &config.role_capabilities).map_err(ErrorUnauthorized))
    }
}
