//! Authentication middleware
//!
//! JWT authentication and role-based access control middleware.
//! Token issuance lives in a separate identity service; this layer only
//! verifies bearer tokens and surfaces the caller's role so stock
//! operations can gate the decisions they own.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{AppError, ErrorResponse};
use crate::AppState;

/// Roles allowed to approve or reject pending stock.
/// Matched case-insensitively; Thai display names appear alongside their
/// English equivalents because both occur in issued tokens.
const APPROVAL_ROLES: &[&str] = &[
    "admin",
    "store manager",
    "ผู้จัดการร้าน",
    "developer",
    "นักพัฒนา",
    "ceo",
    "super admin",
    "superadmin",
];

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub role: String,
    pub branch_code: Option<String>,
}

impl AuthUser {
    /// Whether this caller may approve or reject pending stock
    pub fn can_approve_stock(&self) -> bool {
        let role = self.role.to_lowercase();
        APPROVAL_ROLES.iter().any(|allowed| role == *allowed)
    }
}

/// Guard for the approval/rejection decisions
pub fn check_approval_role(user: &AuthUser) -> Result<(), AppError> {
    if user.can_approve_stock() {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

/// Authentication middleware that validates JWT tokens against the
/// configured secret
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    let claims = match decode_jwt(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(err) => {
            return err.into_response();
        }
    };

    let user_id = match uuid::Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    let auth_user = AuthUser {
        user_id,
        role: claims.role,
        branch_code: claims.branch_code,
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: String,
    role: String,
    branch_code: Option<String>,
    exp: i64,
    iat: i64,
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: crate::error::ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: message.to_string(),
            message_th: "ไม่ได้รับอนุญาต".to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: crate::error::ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_th: "ต้องเข้าสู่ระบบก่อน".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: uuid::Uuid::nil(),
            role: role.to_string(),
            branch_code: None,
        }
    }

    #[test]
    fn managerial_roles_may_approve() {
        for role in ["Admin", "Store Manager", "ผู้จัดการร้าน", "CEO", "Super Admin"] {
            assert!(user(role).can_approve_stock(), "role {} should approve", role);
        }
    }

    #[test]
    fn sales_roles_may_not_approve() {
        for role in ["Sales", "cashier", "พนักงานขาย", ""] {
            assert!(!user(role).can_approve_stock(), "role {} should not approve", role);
        }
    }

    #[test]
    fn check_approval_role_maps_to_permission_error() {
        assert!(check_approval_role(&user("admin")).is_ok());
        assert!(matches!(
            check_approval_role(&user("cashier")),
            Err(AppError::InsufficientPermissions)
        ));
    }

    fn token(secret: &str, issued_offset: i64, expiry_offset: i64) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: uuid::Uuid::nil().to_string(),
            role: "admin".to_string(),
            branch_code: None,
            exp: now + expiry_offset,
            iat: now + issued_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("token encodes")
    }

    #[test]
    fn decode_only_accepts_the_configured_secret() {
        let valid = token("secret-a", 0, 3600);
        assert!(decode_jwt(&valid, "secret-a").is_ok());
        assert!(matches!(
            decode_jwt(&valid, "secret-b"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn decode_distinguishes_expiry_from_tampering() {
        let expired = token("secret-a", -7200, -3600);
        assert!(matches!(
            decode_jwt(&expired, "secret-a"),
            Err(AppError::TokenExpired)
        ));
    }
}
