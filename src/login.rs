use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
#[cfg(feature = "web")]
use axum::{
    Form,
    extract::State,
    http::{Method, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
#[cfg(feature = "web")]
use axum_extra::extract::cookie::{Cookie, CookieJar};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::PathBuf;
#[cfg(feature = "web")]
use std::sync::Arc;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

#[cfg(feature = "web")]
use crate::app::AppState;

/// A registered staff account.
///
/// Accounts guard the admin dashboard; the field entry form is used
/// without one.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    /// Username (unique identifier for the user)
    pub username: String,

    /// Contact email address
    pub email: String,

    /// Argon2 hash of the user's password
    pub password_hash: String,
}

/// Credential data for login and registration forms.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserCredentials {
    pub username: String,

    /// Email address (optional for login, required for registration)
    #[serde(default)]
    pub email: String,

    /// Password in plaintext (only transmitted, never stored)
    pub password: String,
}

/// Password change form for an authenticated user.
#[cfg(feature = "web")]
#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordChangeRequest {
    pub username: String,
    pub old_password: String,
    pub new_password: String,

    /// Must match `new_password`
    pub confirm_password: String,
}

/// An authenticated user session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Username of the authenticated user
    pub user_id: String,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

/// Global sessions storage
///
/// Stores all active user sessions in a thread-safe map.
lazy_static! {
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
}

const USERS_FILE: &str = "users.json";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// User registry backed by a JSON file in the data directory.
#[derive(Debug, Clone)]
pub struct Auth {
    data_dir: PathBuf,
}

impl Auth {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Auth {
            data_dir: data_dir.into(),
        }
    }

    fn users_path(&self) -> PathBuf {
        self.data_dir.join(USERS_FILE)
    }

    /// Create the data directory and an empty users file if missing.
    ///
    /// Call once before any other registry operation.
    pub fn init_database(&self) -> std::io::Result<()> {
        if !self.data_dir.exists() {
            create_dir_all(&self.data_dir)?;
        }

        let users_path = self.users_path();
        if !users_path.exists() {
            let mut file = File::create(users_path)?;
            file.write_all(b"{}")?;
        }

        Ok(())
    }

    /// Read the full user map from disk.
    ///
    /// # Errors
    /// * Returns an error if the users file cannot be opened, read, or parsed
    pub fn get_users(&self) -> Result<HashMap<String, User>, String> {
        let contents = match std::fs::read_to_string(self.users_path()) {
            Ok(contents) => contents,
            Err(_) => return Err("Failed to open users file".to_string()),
        };

        match serde_json::from_str(&contents) {
            Ok(users) => Ok(users),
            Err(_) => Err("Failed to parse users data".to_string()),
        }
    }

    /// Persist the user map to disk.
    pub fn save_users(&self, users: &HashMap<String, User>) -> Result<(), String> {
        let json = match serde_json::to_string_pretty(users) {
            Ok(json) => json,
            Err(_) => return Err("Failed to serialize users data".to_string()),
        };

        if std::fs::write(self.users_path(), json).is_err() {
            return Err("Failed to write users data".to_string());
        }

        Ok(())
    }

    /// Register a new account.
    ///
    /// The password is hashed with Argon2id before storage.
    ///
    /// # Errors
    /// * Returns an error if any field is empty
    /// * Returns an error if the username or email is already in use
    pub fn register_user(&self, username: &str, email: &str, password: &str) -> Result<(), String> {
        if username.is_empty() || password.is_empty() || email.is_empty() {
            return Err("Username, email and password cannot be empty".to_string());
        }

        let mut users = self.get_users()?;
        if users.contains_key(username) {
            return Err("Username already exists".to_string());
        }

        if users.values().any(|user| user.email == email) {
            return Err("Email address is already registered".to_string());
        }

        let password_hash = hash_password(password)?;

        let user = User {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
        };

        users.insert(username.to_string(), user);
        self.save_users(&users)?;

        Ok(())
    }

    /// Check whether the credentials match a registered account.
    pub fn verify_user(&self, username: &str, password: &str) -> Result<bool, String> {
        let users = self.get_users()?;

        if let Some(user) = users.get(username) {
            verify_password(password, &user.password_hash)
        } else {
            Ok(false)
        }
    }

    /// Change an account's password after verifying the current one.
    pub fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), String> {
        let mut users = self.get_users()?;

        let user = match users.get_mut(username) {
            Some(user) => user,
            None => return Err("User not found".to_string()),
        };

        if !verify_password(old_password, &user.password_hash)? {
            return Err("Invalid old password".to_string());
        }
        if new_password != confirm_password {
            return Err("New passwords don't match".to_string());
        }
        if new_password.is_empty() {
            return Err("Password cannot be empty".to_string());
        }

        user.password_hash = hash_password(new_password)?;
        self.save_users(&users)
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err("Password hashing failed".to_string()),
    }
}

/// Verify a password against a stored Argon2 hash.
fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err("Invalid password hash format".to_string()),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

/// Create and store a session for an authenticated user.
///
/// Returns the opaque session ID carried by the `session` cookie.
pub fn create_session(username: &str) -> String {
    let session_id = Uuid::new_v4().to_string();
    let expires_at = SystemTime::now() + Duration::from_secs(SESSION_DURATION);

    let session = Session {
        user_id: username.to_string(),
        expires_at,
    };

    let mut sessions = SESSIONS.write().unwrap();
    sessions.insert(session_id.clone(), session);

    session_id
}

/// Resolve a session ID to its username if the session is still valid.
pub fn validate_session(session_id: &str) -> Option<String> {
    let sessions = SESSIONS.read().unwrap();

    if let Some(session) = sessions.get(session_id) {
        if session.expires_at > SystemTime::now() {
            return Some(session.user_id.clone());
        }
    }

    None
}

/// Drop a session, invalidating its cookie immediately.
pub fn destroy_session(session_id: &str) {
    let mut sessions = SESSIONS.write().unwrap();
    sessions.remove(session_id);
}

// Web handler functions below (only compiled with "web" feature)

/// Serve the login page HTML
#[cfg(feature = "web")]
pub async fn serve_login_page() -> Html<&'static str> {
    Html(include_str!("./static/login.html"))
}

/// Serve the signup page HTML
#[cfg(feature = "web")]
pub async fn serve_signup_page() -> Html<&'static str> {
    Html(include_str!("./static/signup.html"))
}

/// Handle login form submissions.
///
/// Valid credentials get a session cookie and land on the dashboard;
/// anything else bounces back to the login page with an error message in
/// the query string.
#[cfg(feature = "web")]
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<UserCredentials>,
) -> Response {
    // We don't need email for login
    match state
        .auth
        .verify_user(&credentials.username, &credentials.password)
    {
        Ok(true) => {
            let session_id = create_session(&credentials.username);
            let cookie = Cookie::new("session", session_id);
            log::info!("user {} logged in", credentials.username);
            (jar.add(cookie), Redirect::to("/admin")).into_response()
        }
        Ok(false) => Redirect::to("/login?error=Invalid+username+or+password").into_response(),
        Err(message) => {
            log::warn!("login failed for {}: {message}", credentials.username);
            Redirect::to("/login?error=Authentication+error").into_response()
        }
    }
}

/// Handle signup form submissions.
#[cfg(feature = "web")]
pub async fn handle_signup(
    State(state): State<Arc<AppState>>,
    Form(credentials): Form<UserCredentials>,
) -> Response {
    match state.auth.register_user(
        &credentials.username,
        &credentials.email,
        &credentials.password,
    ) {
        Ok(_) => Redirect::to("/login?registered=true").into_response(),
        Err(message) => {
            Redirect::to(&format!("/signup?error={}", urlencoding::encode(&message)))
                .into_response()
        }
    }
}

/// Clear the session cookie and return to the login page.
#[cfg(feature = "web")]
pub async fn handle_logout(jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get("session") {
        destroy_session(cookie.value());
    }

    let cookie = Cookie::new("session", "");
    (jar.add(cookie), Redirect::to("/login"))
}

/// Handle password change for authenticated users.
#[cfg(feature = "web")]
pub async fn handle_change_password(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(change_req): Form<PasswordChangeRequest>,
) -> Response {
    let current_user = jar
        .get("session")
        .and_then(|cookie| validate_session(cookie.value()));

    match current_user {
        Some(current_user) if current_user == change_req.username => {
            match state.auth.change_password(
                &change_req.username,
                &change_req.old_password,
                &change_req.new_password,
                &change_req.confirm_password,
            ) {
                Ok(_) => (StatusCode::OK, "Password changed successfully").into_response(),
                Err(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            }
        }
        Some(_) => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
        None => (StatusCode::UNAUTHORIZED, "Invalid session").into_response(),
    }
}

/// Authentication middleware.
///
/// Lets authenticated requests through with the username attached as a
/// request extension. Public pages, static assets, and the field entry
/// submission stay open; everything else redirects to the login page, or
/// gets a 401 for API calls.
#[cfg(feature = "web")]
pub async fn require_auth(
    jar: CookieJar,
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    // First, if a valid session exists, allow the request.
    if let Some(session_cookie) = jar.get("session") {
        if let Some(username) = validate_session(session_cookie.value()) {
            request.extensions_mut().insert(username);
            return next.run(request).await;
        }
    }

    if is_public(request.uri().path(), request.method()) {
        return next.run(request).await;
    }

    if request.uri().path().starts_with("/api/") {
        return (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({
                "status": "error",
                "message": "Authentication required",
            })),
        )
            .into_response();
    }

    // Failing the above, redirect to login.
    Redirect::to("/login").into_response()
}

// Routes reachable without a session. The field form posts entries
// unauthenticated, exactly like the technicians use it.
#[cfg(feature = "web")]
fn is_public(path: &str, method: &Method) -> bool {
    matches!(
        path,
        "/" | "/sales" | "/terms" | "/privacy" | "/login" | "/signup" | "/logout" | "/log"
    ) || path.starts_with("/static/")
        || (path == "/api/logs" && method == &Method::POST)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> (tempfile::TempDir, Auth) {
        let dir = tempfile::tempdir().unwrap();
        let auth = Auth::new(dir.path());
        auth.init_database().unwrap();
        (dir, auth)
    }

    #[test]
    fn register_then_verify() {
        let (_dir, auth) = auth();
        auth.register_user("ana", "ana@example.com", "hunter2")
            .unwrap();

        assert_eq!(auth.verify_user("ana", "hunter2"), Ok(true));
        assert_eq!(auth.verify_user("ana", "wrong"), Ok(false));
        assert_eq!(auth.verify_user("nobody", "hunter2"), Ok(false));
    }

    #[test]
    fn register_rejects_duplicates_and_blanks() {
        let (_dir, auth) = auth();
        auth.register_user("ana", "ana@example.com", "hunter2")
            .unwrap();

        assert!(auth.register_user("ana", "other@example.com", "pw").is_err());
        assert!(auth.register_user("bob", "ana@example.com", "pw").is_err());
        assert!(auth.register_user("", "x@example.com", "pw").is_err());
        assert!(auth.register_user("carl", "x@example.com", "").is_err());
    }

    #[test]
    fn passwords_are_stored_hashed() {
        let (_dir, auth) = auth();
        auth.register_user("ana", "ana@example.com", "hunter2")
            .unwrap();

        let users = auth.get_users().unwrap();
        let stored = &users["ana"].password_hash;
        assert_ne!(stored, "hunter2");
        assert!(stored.starts_with("$argon2"));
    }

    #[test]
    fn change_password_requires_the_old_one() {
        let (_dir, auth) = auth();
        auth.register_user("ana", "ana@example.com", "hunter2")
            .unwrap();

        assert!(auth.change_password("ana", "wrong", "new", "new").is_err());
        assert!(auth
            .change_password("ana", "hunter2", "new", "other")
            .is_err());
        auth.change_password("ana", "hunter2", "newpass", "newpass")
            .unwrap();

        assert_eq!(auth.verify_user("ana", "newpass"), Ok(true));
        assert_eq!(auth.verify_user("ana", "hunter2"), Ok(false));
    }

    #[test]
    fn sessions_validate_until_destroyed() {
        let session_id = create_session("ana");
        assert_eq!(validate_session(&session_id), Some("ana".to_string()));
        assert_eq!(validate_session("not-a-session"), None);

        destroy_session(&session_id);
        assert_eq!(validate_session(&session_id), None);
    }
}
