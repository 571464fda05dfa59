//! Authentication: bearer tokens, registration, login, Google sign-in and
//! password reset.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mappoint_common::{AppError, AppResult, IdGenerator, ImageHostService};
use mappoint_db::{
    entities::{
        password_reset_token,
        user::{self, ConnectionType, Gender, UserRole},
    },
    repositories::{PasswordResetRepository, UserRepository},
};
use sea_orm::{Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::services::email::{EmailMessage, LogMailer, MailerService};
use crate::services::password::{self, MIN_RESET_PASSWORD_LEN};
use crate::services::visibility::Viewer;

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Identity of the caller on an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedIdentity {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    /// The marker viewer for this identity.
    #[must_use]
    pub fn viewer(&self) -> Viewer {
        Viewer::new(&self.user_id, self.role)
    }
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Sign a token for a user.
    pub fn issue(&self, user: &user::Model) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify signature and expiry.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AppError::Unauthorized
            })
    }
}

/// Identity asserted by a verified Google ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Google ID token verification.
#[async_trait]
pub trait GoogleVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> AppResult<GoogleIdentity>;
}

pub type GoogleVerifierService = Arc<dyn GoogleVerifier>;

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Verifies ID tokens against Google's tokeninfo endpoint.
pub struct TokenInfoVerifier {
    url: String,
    client_id: String,
    http_client: reqwest::Client,
}

impl TokenInfoVerifier {
    #[must_use]
    pub fn new(url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client_id: client_id.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl GoogleVerifier for TokenInfoVerifier {
    async fn verify(&self, id_token: &str) -> AppResult<GoogleIdentity> {
        let response = self
            .http_client
            .get(&self.url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Google verification failed: {e}")))?;

        if response.status().is_client_error() {
            return Err(AppError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Google tokeninfo returned {}",
                response.status()
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid tokeninfo response: {e}")))?;

        if info.aud != self.client_id {
            tracing::warn!(aud = %info.aud, "Google token issued for another client");
            return Err(AppError::Unauthorized);
        }
        if info.email_verified.as_deref() == Some("false") {
            return Err(AppError::Unauthorized);
        }
        let email = info.email.ok_or(AppError::Unauthorized)?;

        Ok(GoogleIdentity {
            email,
            name: info.name,
            picture: info.picture,
        })
    }
}

/// Registration form.
#[derive(Debug, Clone, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub gender: Gender,
    /// `data:<mime>;base64,<payload>`
    pub profile_image: Option<String>,
}

/// Result of a Google sign-in.
#[derive(Debug, Clone)]
pub struct GoogleLogin {
    pub token: String,
    pub user: user::Model,
}

/// Normalize an email for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hex SHA-256 of a reset token; only the digest is stored.
#[must_use]
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Split a base64 data URI into content type and bytes.
pub fn decode_data_uri(uri: &str) -> AppResult<(String, Vec<u8>)> {
    let invalid = || AppError::Validation("Invalid profile image".to_string());

    let rest = uri.trim().strip_prefix("data:").ok_or_else(invalid)?;
    let (meta, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let content_type = meta.strip_suffix(";base64").ok_or_else(invalid)?;
    if !content_type.starts_with("image/") {
        return Err(invalid());
    }
    let data = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
    Ok((content_type.to_string(), data))
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    reset_repo: PasswordResetRepository,
    tokens: TokenService,
    image_host: ImageHostService,
    profile_folder: String,
    google: Option<GoogleVerifierService>,
    mailer: MailerService,
    reset_ttl: Duration,
    reset_url: String,
    id_gen: IdGenerator,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        reset_repo: PasswordResetRepository,
        tokens: TokenService,
        image_host: ImageHostService,
        profile_folder: String,
    ) -> Self {
        Self {
            user_repo,
            reset_repo,
            tokens,
            image_host,
            profile_folder,
            google: None,
            mailer: Arc::new(LogMailer),
            reset_ttl: Duration::hours(1),
            reset_url: "http://localhost:3000/reset-password".to_string(),
            id_gen: IdGenerator::new(),
        }
    }

    pub fn set_google_verifier(&mut self, verifier: GoogleVerifierService) {
        self.google = Some(verifier);
    }

    pub fn set_mailer(&mut self, mailer: MailerService) {
        self.mailer = mailer;
    }

    /// Configure reset token lifetime and the link sent by email.
    pub fn set_password_reset(&mut self, ttl_secs: i64, url: String) {
        self.reset_ttl = Duration::seconds(ttl_secs);
        self.reset_url = url;
    }

    /// Resolve a bearer token to the current identity. The user row is
    /// reloaded so deleted accounts and role changes apply immediately.
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthenticatedIdentity> {
        let claims = self.tokens.verify(token)?;
        let user = self
            .user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthenticatedIdentity {
            user_id: user.id,
            email: user.email,
            role: user.role,
        })
    }

    /// Register a mail account and return a bearer token.
    pub async fn register(&self, mut input: RegisterInput) -> AppResult<String> {
        input.username = input.username.trim().to_string();
        input.email = normalize_email(&input.email);
        input.validate()?;
        password::check_strength(&input.password)?;

        if self
            .user_repo
            .find_by_email_or_username(&input.email, &input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Email or username already in use".to_string(),
            ));
        }

        let user_id = self.id_gen.generate();
        let profile_image = match input.profile_image.as_deref() {
            Some(uri) if !uri.trim().is_empty() => {
                let (content_type, data) = decode_data_uri(uri)?;
                let ext = content_type.trim_start_matches("image/");
                Some(
                    self.image_host
                        .upload(
                            &self.profile_folder,
                            &format!("{user_id}.{ext}"),
                            &data,
                            &content_type,
                        )
                        .await?,
                )
            }
            _ => None,
        };

        let model = user::ActiveModel {
            id: Set(user_id),
            username: Set(input.username),
            email: Set(input.email),
            password_hash: Set(Some(password::hash_password(&input.password)?)),
            gender: Set(input.gender),
            profile_image_url: Set(profile_image.as_ref().map(|img| img.url.clone())),
            role: Set(UserRole::User),
            connection_type: Set(ConnectionType::Mail),
            joined_at: Set(Utc::now().into()),
            last_login: Set(None),
            updated_at: Set(None),
        };

        let user = match self.user_repo.create(model).await {
            Ok(user) => user,
            Err(e) => {
                if let Some(ref img) = profile_image
                    && let Err(destroy_err) = self.image_host.destroy(&img.public_id).await
                {
                    tracing::warn!(error = %destroy_err, "Failed to delete orphaned profile image");
                }
                return Err(e);
            }
        };

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        self.tokens.issue(&user)
    }

    /// Log in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<String> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AppError::InvalidCredentials)?;
        if !password::verify_password(password, hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let user = self.user_repo.touch_last_login(user).await?;
        tracing::info!(user_id = %user.id, "User logged in");
        self.tokens.issue(&user)
    }

    /// Sign in with a Google ID token, creating the account on first use.
    pub async fn google(&self, id_token: &str) -> AppResult<GoogleLogin> {
        let verifier = self
            .google
            .as_ref()
            .ok_or_else(|| AppError::Config("Google sign-in is not configured".to_string()))?;
        let identity = verifier.verify(id_token).await?;
        let email = normalize_email(&identity.email);

        let user = match self.user_repo.find_by_email(&email).await? {
            Some(existing) => self.user_repo.touch_last_login(existing).await?,
            None => {
                let user_id = self.id_gen.generate();
                let username = self.available_username(&email, &user_id).await?;
                let now = Utc::now();
                let model = user::ActiveModel {
                    id: Set(user_id),
                    username: Set(username),
                    email: Set(email),
                    password_hash: Set(None),
                    gender: Set(Gender::Other),
                    profile_image_url: Set(identity.picture),
                    role: Set(UserRole::User),
                    connection_type: Set(ConnectionType::Google),
                    joined_at: Set(now.into()),
                    last_login: Set(Some(now.into())),
                    updated_at: Set(None),
                };
                let user = self.user_repo.create(model).await?;
                tracing::info!(user_id = %user.id, "User registered through Google");
                user
            }
        };

        let token = self.tokens.issue(&user)?;
        Ok(GoogleLogin { token, user })
    }

    async fn available_username(&self, email: &str, user_id: &str) -> AppResult<String> {
        let base: String = email
            .split('@')
            .next()
            .unwrap_or_default()
            .chars()
            .take(40)
            .collect();
        if self.user_repo.find_by_username(&base).await?.is_none() {
            return Ok(base);
        }
        let suffix = &user_id[user_id.len().saturating_sub(6)..];
        Ok(format!("{base}_{suffix}"))
    }

    /// Start a password reset. Unknown emails succeed silently.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        let Some(user) = self.user_repo.find_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = self.id_gen.generate_token();
        let now = Utc::now();
        let model = password_reset_token::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user.id.clone()),
            token_hash: Set(hash_reset_token(&token)),
            expires_at: Set((now + self.reset_ttl).into()),
            used_at: Set(None),
            created_at: Set(now.into()),
        };
        self.reset_repo.create(model).await?;

        let link = format!("{}?token={token}", self.reset_url);
        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Reset your mapPoint password".to_string(),
            body: format!(
                "Hello {},\n\nUse the link below to choose a new password. It expires in {} minutes.\n\n{link}\n\nIf you did not ask for this, ignore this email.\n",
                user.username,
                self.reset_ttl.num_minutes()
            ),
        };
        if let Err(e) = self.mailer.send(message).await {
            tracing::warn!(error = %e, user_id = %user.id, "Failed to send password reset email");
        }

        Ok(())
    }

    /// Finish a password reset with a token from the email link.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> AppResult<()> {
        if new_password != confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }
        if new_password.chars().count() < MIN_RESET_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_RESET_PASSWORD_LEN} characters"
            )));
        }

        let txn = self
            .reset_repo
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let stored = self
            .reset_repo
            .find_unused_in(&txn, &hash_reset_token(token))
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid or expired token".to_string()))?;
        if stored.expires_at < Utc::now() {
            return Err(AppError::BadRequest("Invalid or expired token".to_string()));
        }

        let user_id = stored.user_id.clone();
        let update = user::ActiveModel {
            id: Set(user_id.clone()),
            password_hash: Set(Some(password::hash_password(new_password)?)),
            updated_at: Set(Some(Utc::now().into())),
            ..Default::default()
        };
        self.user_repo.update_in(&txn, update).await?;
        self.reset_repo.mark_used_in(&txn, stored).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(user_id = %user_id, "Password reset");
        Ok(())
    }
}
