// Verification domain models - challenges, delivery channels, outcomes.
//
// These are pure domain types; the email/SMS providers behind the ports
// never leak into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::location::Location;

/// Why a code was issued. Part of the challenge key, so a registration code
/// can never satisfy a login check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Registration,
    Login,
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Purpose::Registration => write!(f, "registration"),
            Purpose::Login => write!(f, "login"),
        }
    }
}

/// At most one live challenge exists per key; issuing again overwrites the
/// previous one (last writer wins, by design).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeKey {
    pub identity: String,
    pub purpose: Purpose,
}

impl ChallengeKey {
    pub fn new(identity: impl Into<String>, purpose: Purpose) -> Self {
        Self {
            identity: identity.into(),
            purpose,
        }
    }
}

/// A short-lived one-time code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    /// Six decimal digits.
    pub code: String,
    pub expires_at: DateTime<Utc>,
    /// Pending registration data, released to the caller only on successful
    /// verification.
    pub payload: Option<serde_json::Value>,
}

/// Where the code went (or should have gone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Email,
    Sms,
}

/// Contact details the router picks a channel from.
#[derive(Debug, Clone)]
pub struct Contact {
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<Location>,
}

/// What happened to an issuance.
///
/// `delivered == false` only occurs in lenient mode: the challenge stands,
/// but the provider send failed and the code was logged for manual recovery.
#[derive(Debug, Clone)]
pub struct IssueReceipt {
    pub channel: DeliveryChannel,
    pub delivered: bool,
    pub expires_at: DateTime<Utc>,
}

/// Every verification failure is a distinct outcome so the caller can give
/// precise feedback ("expired" vs "wrong code").
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// The challenge matched and has already been removed - single use. Any
    /// side effect (account creation, token issuance) happens after this.
    Verified {
        payload: Option<serde_json::Value>,
    },
    Expired,
    Mismatch,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// How long a code stays valid.
    pub code_ttl: chrono::Duration,
    /// Hard cap on a single delivery attempt.
    pub delivery_timeout: Duration,
    /// When true (the default), a failed delivery fails the whole issuance
    /// and removes the challenge. When false, the challenge stands and the
    /// code is logged so an operator can hand it over manually.
    pub strict_delivery: bool,
    /// Country code assumed for bare national phone numbers.
    pub home_country_code: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl: chrono::Duration::minutes(10),
            delivery_timeout: Duration::from_secs(8),
            strict_delivery: true,
            home_country_code: "91".to_string(),
        }
    }
}
