use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, RegisterRequest, UpdateProfileRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::UserStore,
    repo_types::{NewUser, ProfileChanges, User},
};
use crate::{
    db::StoreError,
    error::{ApiError, AuthFailure},
    validate::{optional_text, required_text},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: Option<String>) -> Result<String, ApiError> {
    let email = required_text(email, "email")?.to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::invalid_input("email is not valid"));
    }
    Ok(email)
}

pub async fn register(users: &dyn UserStore, req: RegisterRequest) -> Result<User, ApiError> {
    let email = normalize_email(req.email)?;
    let name = required_text(req.name, "nombre")?;
    let password = match req.password {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ApiError::invalid_input("password is required")),
    };

    if users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(duplicate_email());
    }

    let password_hash = hash_password(password).await?;
    let new_user = NewUser {
        name,
        email,
        password_hash,
        image: optional_text(req.image),
    };

    // The unique index settles concurrent registrations of the same email.
    let user = users.create(&new_user).await.map_err(|e| match e {
        StoreError::UniqueViolation { .. } => duplicate_email(),
        other => other.into(),
    })?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<(String, User), ApiError> {
    // No format check: anything not registered is simply unknown.
    let email = required_text(req.email, "email")?.to_lowercase();
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::invalid_input("password is required"))?;

    let user = users.find_by_email(&email).await?.ok_or_else(|| {
        warn!(%email, "login unknown email");
        ApiError::not_found("No account registered with that email")
    })?;

    if !verify_password(password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "login invalid password");
        return Err(ApiError::Unauthenticated(AuthFailure::InvalidCredentials));
    }

    let token = keys.issue(user.id)?;
    info!(user_id = user.id, "user logged in");
    Ok((token, user))
}

pub async fn load_user(users: &dyn UserStore, id: i64) -> Result<User, ApiError> {
    users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn update_profile(
    users: &dyn UserStore,
    user_id: i64,
    req: UpdateProfileRequest,
) -> Result<User, ApiError> {
    let name = match req.name {
        Some(name) => Some(required_text(Some(name), "nombre")?),
        None => None,
    };
    let changes = ProfileChanges {
        name,
        image: optional_text(req.image),
    };
    if changes.name.is_none() && changes.image.is_none() {
        return Err(ApiError::invalid_input("nothing to update: send nombre or imagen"));
    }

    let user = users
        .update_profile(user_id, &changes)
        .await?
        .ok_or(ApiError::Unauthenticated(AuthFailure::UnknownUser))?;
    info!(user_id, "profile updated");
    Ok(user)
}

fn duplicate_email() -> ApiError {
    ApiError::conflict("DUPLICATE_EMAIL", "Email already registered")
}
