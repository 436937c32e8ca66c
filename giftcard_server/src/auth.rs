//! Admin authentication.
//!
//! Admin routes take an [`Admin`] argument. Extracting it checks the `X-Admin-Token` header against the token the
//! server was configured with ([`AdminAuth`], registered as app data). When no token is configured every admin request
//! is refused.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use gcm_common::Secret;
use log::*;

use crate::{
    errors::{AuthError, ServerError},
    helpers::constant_time_eq,
};

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

#[derive(Debug, Clone, Default)]
pub struct AdminAuth {
    token: Secret<String>,
}

impl AdminAuth {
    pub fn new(token: Secret<String>) -> Self {
        Self { token }
    }

    pub fn is_enabled(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn check(&self, presented: Option<&str>) -> Result<(), AuthError> {
        if !self.is_enabled() {
            return Err(AuthError::AdminDisabled);
        }
        let presented = presented.map(str::trim).filter(|s| !s.is_empty()).ok_or(AuthError::MissingToken)?;
        if constant_time_eq(presented.as_bytes(), self.token.reveal().as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

/// Proof that the request carried a valid admin token
#[derive(Debug, Clone, Copy)]
pub struct Admin;

impl FromRequest for Admin {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let Some(auth) = req.app_data::<web::Data<AdminAuth>>() else {
            error!("💻️ AdminAuth has not been registered with the server. Refusing admin access.");
            return ready(Err(AuthError::AdminDisabled.into()));
        };
        let presented = req.headers().get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok());
        let result = auth.check(presented).map(|_| Admin).map_err(|e| {
            warn!("💻️ Admin request to {} refused. {e}", req.path());
            ServerError::from(e)
        });
        ready(result)
    }
}
