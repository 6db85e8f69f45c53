use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Remote failure message that signals "already in the desired state". The
/// upstream suspension function reports this exact text; it is matched
/// verbatim and must not be reworded.
pub const ACCOUNT_ALREADY_SUSPENDED: &str = "Account already suspended";

pub const PAYLOAD_ACCOUNT_KEY: &str = "account";
pub const PAYLOAD_EVENTS_KEY: &str = "events";

pub type EventPayload = BTreeMap<String, Value>;

/// Account lifecycle transitions emitted by the upstream event producer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountEventType {
    AccountCreated,
    AccountActivated,
    AccountSuspended,
    AccountArchived,
}

impl AccountEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountCreated => "ACCOUNT_CREATED",
            Self::AccountActivated => "ACCOUNT_ACTIVATED",
            Self::AccountSuspended => "ACCOUNT_SUSPENDED",
            Self::AccountArchived => "ACCOUNT_ARCHIVED",
        }
    }
}

/// Account status values. The variant names share a naming space with
/// [`AccountEventType`]; applying an event maps to the status of the same
/// name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    AccountCreated,
    AccountActivated,
    AccountSuspended,
    AccountArchived,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountCreated => "ACCOUNT_CREATED",
            Self::AccountActivated => "ACCOUNT_ACTIVATED",
            Self::AccountSuspended => "ACCOUNT_SUSPENDED",
            Self::AccountArchived => "ACCOUNT_ARCHIVED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ACCOUNT_CREATED" => Some(Self::AccountCreated),
            "ACCOUNT_ACTIVATED" => Some(Self::AccountActivated),
            "ACCOUNT_SUSPENDED" => Some(Self::AccountSuspended),
            "ACCOUNT_ARCHIVED" => Some(Self::AccountArchived),
            _ => None,
        }
    }

    /// Status named after the given event type. An event type without a
    /// status counterpart is a contract violation between the event producer
    /// and this command, not a recoverable condition.
    pub fn for_event_type(event_type: AccountEventType) -> Result<Self, ContractError> {
        Self::from_name(event_type.as_str()).ok_or_else(|| {
            ContractError::new(format!(
                "Event type {} has no matching account status",
                event_type.as_str()
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub account_number: String,
    pub status: AccountStatus,
}

/// An account lifecycle event. For suspension requests the payload carries at
/// least `"account"` (the target [`Account`]) and `"events"` (the account's
/// event history, ordered newest first: the first element is the most recent
/// event).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountEvent {
    #[serde(rename = "type")]
    pub event_type: AccountEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub payload: EventPayload,
}

impl AccountEvent {
    pub fn new(event_type: AccountEventType) -> Self {
        Self {
            event_type,
            created_at: None,
            payload: EventPayload::new(),
        }
    }
}

/// Error slot of a [`LambdaResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseError {
    pub error_code: String,
    pub error_message: String,
}

impl ResponseError {
    pub fn new(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            error_message: error_message.into(),
        }
    }

    pub fn already_suspended() -> Self {
        Self::new("already_suspended", ACCOUNT_ALREADY_SUSPENDED)
    }
}

/// Result envelope for remote function invocations. Exactly one of the two
/// slots is populated: an error with no payload signals a recovered failure,
/// a payload with no error signals success. Callers rely on this to tell the
/// two apart, so the fields stay private and construction goes through
/// [`LambdaResponse::from_payload`] and [`LambdaResponse::from_error`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LambdaResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ResponseError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<T>,
}

impl<T> LambdaResponse<T> {
    pub fn from_payload(payload: T) -> Self {
        Self {
            error: None,
            payload: Some(payload),
        }
    }

    pub fn from_error(error: ResponseError) -> Self {
        Self {
            error: Some(error),
            payload: None,
        }
    }

    pub fn error(&self) -> Option<&ResponseError> {
        self.error.as_ref()
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// True when the envelope carries a recovered failure instead of a
    /// payload.
    pub fn is_recovered(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    message: String,
}

impl ContractError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ContractError {}

pub fn stable_contract_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of contract value should not fail")
}

/// Stable identity of an event, used to correlate log lines across the
/// command and its fallback path.
pub fn event_fingerprint(event: &AccountEvent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stable_contract_json(event));
    format!("{:x}", hasher.finalize())
}
