use serde_json::Value;

use crate::contract::{
    Account, AccountEvent, AccountEventType, AccountStatus, ContractError,
    ACCOUNT_ALREADY_SUSPENDED, PAYLOAD_ACCOUNT_KEY, PAYLOAD_EVENTS_KEY,
};

/// Typed view of the payload entries the fallback path needs. Built and
/// validated at the point where the resilience policy dispatches the
/// fallback, so the recomputation itself never touches untyped JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackContext {
    pub account: Account,
    /// Ordered newest first: the first element is the most recent event.
    pub prior_events: Vec<AccountEvent>,
}

impl FallbackContext {
    pub fn from_event(event: &AccountEvent) -> Result<Self, ContractError> {
        let account = require_entry(event, PAYLOAD_ACCOUNT_KEY)?;
        let account: Account = serde_json::from_value(account.clone()).map_err(|error| {
            ContractError::new(format!(
                "Event payload entry '{PAYLOAD_ACCOUNT_KEY}' is not an account: {error}"
            ))
        })?;

        let prior_events = require_entry(event, PAYLOAD_EVENTS_KEY)?;
        let prior_events: Vec<AccountEvent> =
            serde_json::from_value(prior_events.clone()).map_err(|error| {
                ContractError::new(format!(
                    "Event payload entry '{PAYLOAD_EVENTS_KEY}' is not an event sequence: {error}"
                ))
            })?;

        Ok(Self {
            account,
            prior_events,
        })
    }
}

fn require_entry<'a>(event: &'a AccountEvent, key: &str) -> Result<&'a Value, ContractError> {
    event
        .payload
        .get(key)
        .ok_or_else(|| ContractError::new(format!("Event payload is missing the '{key}' entry")))
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackError {
    /// The account's most recent event already suspended it; the requested
    /// transition is a no-op and the caller violated the command's
    /// precondition by dispatching it here.
    AlreadySuspended,
    Contract(ContractError),
}

impl std::fmt::Display for FallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadySuspended => f.write_str(ACCOUNT_ALREADY_SUSPENDED),
            Self::Contract(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for FallbackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AlreadySuspended => None,
            Self::Contract(error) => Some(error),
        }
    }
}

impl From<ContractError> for FallbackError {
    fn from(error: ContractError) -> Self {
        Self::Contract(error)
    }
}

/// Local recomputation of the account's status from its event history,
/// used when the remote suspension function is unavailable.
///
/// Double-checks that the most recent prior event did not already suspend
/// the account before assigning the status named after the triggering
/// event's type.
pub fn recompute_status(
    event: &AccountEvent,
    context: FallbackContext,
) -> Result<Account, FallbackError> {
    let last_event_type = context.prior_events.first().map(|prior| prior.event_type);
    if last_event_type == Some(AccountEventType::AccountSuspended) {
        return Err(FallbackError::AlreadySuspended);
    }

    let mut account = context.account;
    account.status = AccountStatus::for_event_type(event.event_type)?;
    Ok(account)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::contract::stable_contract_json;

    use super::*;

    fn sample_account() -> Account {
        Account {
            account_number: "A-100".to_string(),
            status: AccountStatus::AccountActivated,
        }
    }

    fn suspension_event(prior_events: Vec<AccountEvent>) -> AccountEvent {
        let mut event = AccountEvent::new(AccountEventType::AccountSuspended);
        event.payload.insert(
            PAYLOAD_ACCOUNT_KEY.to_string(),
            serde_json::to_value(sample_account()).expect("account should serialize"),
        );
        event.payload.insert(
            PAYLOAD_EVENTS_KEY.to_string(),
            serde_json::to_value(prior_events).expect("events should serialize"),
        );
        event
    }

    #[test]
    fn context_extraction_requires_account_entry() {
        let mut event = suspension_event(Vec::new());
        event.payload.remove(PAYLOAD_ACCOUNT_KEY);

        let error = FallbackContext::from_event(&event).expect_err("extraction should fail");
        assert_eq!(error.message(), "Event payload is missing the 'account' entry");
    }

    #[test]
    fn context_extraction_rejects_mistyped_events_entry() {
        let mut event = suspension_event(Vec::new());
        event
            .payload
            .insert(PAYLOAD_EVENTS_KEY.to_string(), json!("not-a-sequence"));

        let error = FallbackContext::from_event(&event).expect_err("extraction should fail");
        assert!(error
            .message()
            .starts_with("Event payload entry 'events' is not an event sequence"));
    }

    #[test]
    fn empty_history_recomputes_suspended_status() {
        let event = suspension_event(Vec::new());
        let context = FallbackContext::from_event(&event).expect("context should extract");

        let account = recompute_status(&event, context).expect("recomputation should succeed");
        assert_eq!(account.status, AccountStatus::AccountSuspended);
        assert_eq!(account.account_number, "A-100");
    }

    #[test]
    fn most_recent_suspension_fails_the_precondition_check() {
        let event = suspension_event(vec![AccountEvent::new(AccountEventType::AccountSuspended)]);
        let context = FallbackContext::from_event(&event).expect("context should extract");

        let error = recompute_status(&event, context).expect_err("recomputation should fail");
        assert_eq!(error, FallbackError::AlreadySuspended);
        assert_eq!(error.to_string(), "Account already suspended");
    }

    #[test]
    fn only_the_first_history_element_is_checked() {
        // Newest first: a suspension deeper in the history does not trip the
        // precondition check.
        let event = suspension_event(vec![
            AccountEvent::new(AccountEventType::AccountActivated),
            AccountEvent::new(AccountEventType::AccountSuspended),
        ]);
        let context = FallbackContext::from_event(&event).expect("context should extract");

        let account = recompute_status(&event, context).expect("recomputation should succeed");
        assert_eq!(account.status, AccountStatus::AccountSuspended);
    }

    #[test]
    fn status_follows_the_triggering_event_type() {
        let mut event = suspension_event(Vec::new());
        event.event_type = AccountEventType::AccountArchived;
        let context = FallbackContext::from_event(&event).expect("context should extract");

        let account = recompute_status(&event, context).expect("recomputation should succeed");
        assert_eq!(account.status, AccountStatus::AccountArchived);
    }

    #[test]
    fn context_round_trips_through_payload_json() {
        let prior = vec![AccountEvent::new(AccountEventType::AccountActivated)];
        let event = suspension_event(prior.clone());

        let context = FallbackContext::from_event(&event).expect("context should extract");
        assert_eq!(context.account, sample_account());
        assert_eq!(
            stable_contract_json(&context.prior_events),
            stable_contract_json(&prior)
        );
    }
}
