// Verification router - core business logic for one-time-code flows.
//
// This service handles:
// - Channel selection (email for southern regions, SMS elsewhere)
// - Code issuance, resend and strict verification ordering
// - The gated fallback when a delivery provider is down
//
// NO provider dependencies here - email, SMS and storage sit behind ports.

use super::verification_models::{
    Challenge, ChallengeKey, Contact, DeliveryChannel, IssueReceipt, Purpose, VerificationConfig,
    VerifyOutcome,
};
use crate::core::location::is_southern_region;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;
use tokio::time::timeout;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Storage error: {0}")]
    StorageError(String),

    /// SMS routing with no phone number on file. A hard precondition
    /// failure, never silently downgraded to email.
    #[error("Phone number required for SMS delivery")]
    MissingPhone,

    #[error("Delivery failed on the {channel:?} channel: {message}")]
    DeliveryFailed {
        channel: DeliveryChannel,
        message: String,
    },

    #[error("No pending challenge to resend")]
    NoPendingChallenge,
}

/// Provider-side send failure, opaque to the core.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SendError(pub String);

// ============================================================================
// PORTS
// ============================================================================

/// Keyed challenge storage.
///
/// `put` must be an atomic overwrite: concurrent issuance for the same key
/// is last-writer-wins, and a reader must never observe a half-written
/// entry.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn get(&self, key: &ChallengeKey) -> Result<Option<Challenge>, VerificationError>;
    async fn put(&self, key: ChallengeKey, challenge: Challenge)
        -> Result<(), VerificationError>;
    async fn remove(&self, key: &ChallengeKey) -> Result<Option<Challenge>, VerificationError>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), SendError>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// `phone` is already normalized to E.164-like form.
    async fn send(&self, phone: &str, body: &str) -> Result<(), SendError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct VerificationRouter<S, E, M> {
    store: S,
    email: E,
    sms: M,
    config: VerificationConfig,
}

impl<S, E, M> VerificationRouter<S, E, M>
where
    S: ChallengeStore,
    E: EmailSender,
    M: SmsSender,
{
    pub fn new(store: S, email: E, sms: M, config: VerificationConfig) -> Self {
        Self {
            store,
            email,
            sms,
            config,
        }
    }

    /// Uniform six-digit code.
    fn generate_code() -> String {
        rand::thread_rng().gen_range(100_000..=999_999).to_string()
    }

    /// Email when the contact's region classifies as southern, SMS
    /// otherwise. SMS without a phone number is a hard error, checked
    /// before any state change.
    fn select_channel(&self, contact: &Contact) -> Result<DeliveryChannel, VerificationError> {
        let southern = contact
            .location
            .as_ref()
            .map(|l| is_southern_region(&l.region))
            .unwrap_or(false);

        if southern {
            Ok(DeliveryChannel::Email)
        } else if contact.phone.is_none() {
            Err(VerificationError::MissingPhone)
        } else {
            Ok(DeliveryChannel::Sms)
        }
    }

    /// Issue a new challenge, overwriting any prior one under the same key,
    /// and deliver the code.
    pub async fn issue(
        &self,
        identity: &str,
        purpose: Purpose,
        contact: &Contact,
        payload: Option<serde_json::Value>,
    ) -> Result<IssueReceipt, VerificationError> {
        let channel = self.select_channel(contact)?;
        let code = Self::generate_code();
        let expires_at = Utc::now() + self.config.code_ttl;
        let key = ChallengeKey::new(identity, purpose);

        self.store
            .put(
                key.clone(),
                Challenge {
                    code: code.clone(),
                    expires_at,
                    payload,
                },
            )
            .await?;

        self.deliver(&key, channel, contact, &code, expires_at).await
    }

    /// Regenerate the code and reset expiry under the same key, invalidating
    /// the previous code. The pending payload is preserved.
    pub async fn resend(
        &self,
        identity: &str,
        purpose: Purpose,
        contact: &Contact,
    ) -> Result<IssueReceipt, VerificationError> {
        let key = ChallengeKey::new(identity, purpose);
        let existing = self
            .store
            .get(&key)
            .await?
            .ok_or(VerificationError::NoPendingChallenge)?;

        let channel = self.select_channel(contact)?;
        let code = Self::generate_code();
        let expires_at = Utc::now() + self.config.code_ttl;

        self.store
            .put(
                key.clone(),
                Challenge {
                    code: code.clone(),
                    expires_at,
                    payload: existing.payload,
                },
            )
            .await?;

        self.deliver(&key, channel, contact, &code, expires_at).await
    }

    /// Check a submitted code.
    ///
    /// Order is strict: existence, then expiry, then equality. An expired
    /// entry is removed; a mismatch leaves the challenge in place. On
    /// success the challenge is removed *before* the payload is handed
    /// back, so the code is single-use even if the caller's side effect
    /// fails afterwards.
    pub async fn verify(
        &self,
        identity: &str,
        purpose: Purpose,
        code: &str,
    ) -> Result<VerifyOutcome, VerificationError> {
        let key = ChallengeKey::new(identity, purpose);

        let challenge = match self.store.get(&key).await? {
            Some(challenge) => challenge,
            None => return Ok(VerifyOutcome::NotFound),
        };

        if Utc::now() > challenge.expires_at {
            self.store.remove(&key).await?;
            return Ok(VerifyOutcome::Expired);
        }

        if challenge.code != code {
            return Ok(VerifyOutcome::Mismatch);
        }

        self.store.remove(&key).await?;
        Ok(VerifyOutcome::Verified {
            payload: challenge.payload,
        })
    }

    async fn deliver(
        &self,
        key: &ChallengeKey,
        channel: DeliveryChannel,
        contact: &Contact,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<IssueReceipt, VerificationError> {
        let ttl_minutes = self.config.code_ttl.num_minutes();

        let attempt = match channel {
            DeliveryChannel::Email => {
                let body = email_body(code, ttl_minutes);
                timeout(
                    self.config.delivery_timeout,
                    self.email.send(&contact.email, EMAIL_SUBJECT, &body),
                )
                .await
            }
            DeliveryChannel::Sms => {
                let phone = contact
                    .phone
                    .as_deref()
                    .ok_or(VerificationError::MissingPhone)?;
                let phone = normalize_phone(phone, &self.config.home_country_code);
                timeout(
                    self.config.delivery_timeout,
                    self.sms.send(&phone, &sms_body(code, ttl_minutes)),
                )
                .await
            }
        };

        let failure = match attempt {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(_) => Some(format!(
                "timed out after {:?}",
                self.config.delivery_timeout
            )),
        };

        match failure {
            None => {
                tracing::info!(
                    identity = %key.identity,
                    purpose = %key.purpose,
                    channel = ?channel,
                    "verification code delivered"
                );
                Ok(IssueReceipt {
                    channel,
                    delivered: true,
                    expires_at,
                })
            }
            Some(message) if self.config.strict_delivery => {
                // A challenge nobody received must not stay verifiable.
                self.store.remove(key).await?;
                Err(VerificationError::DeliveryFailed { channel, message })
            }
            Some(message) => {
                tracing::warn!(
                    identity = %key.identity,
                    purpose = %key.purpose,
                    channel = ?channel,
                    code,
                    expires_at = %expires_at,
                    error = %message,
                    "delivery failed; challenge kept for manual recovery"
                );
                Ok(IssueReceipt {
                    channel,
                    delivered: false,
                    expires_at,
                })
            }
        }
    }
}

const EMAIL_SUBJECT: &str = "Clipstream - Verification Code";

fn email_body(code: &str, ttl_minutes: i64) -> String {
    format!(
        "Your verification code is {code}. It expires in {ttl_minutes} minutes.\n\n\
         If you didn't request this verification, you can ignore this message."
    )
}

fn sms_body(code: &str, ttl_minutes: i64) -> String {
    format!("Your Clipstream verification code is: {code}. Valid for {ttl_minutes} minutes.")
}

/// Normalize a user-entered phone number to E.164-like form.
///
/// Strips every non-digit, keeps an explicit country code when the length
/// gives one away (11 digits starting with 1, or 12+ digits), and prefixes
/// the configured home country code for bare national numbers - dropping a
/// leading trunk zero first.
pub fn normalize_phone(phone: &str, home_country_code: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    // A leading zero is a trunk prefix, not a country code.
    let digits = digits.strip_prefix('0').unwrap_or(&digits);

    if digits.len() == 11 && digits.starts_with('1') {
        format!("+{digits}")
    } else if digits.len() >= 12 {
        format!("+{digits}")
    } else {
        format!("+{home_country_code}{digits}")
    }
}

// ============================================================================
// TESTS
// ============================================================================
