use serde::Deserialize;

use crate::web::UserRole;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupBody {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SigninBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AccountUpdateBody {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RoleBody {
    pub role: UserRole,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DomainBody {
    pub domain: String,
}
