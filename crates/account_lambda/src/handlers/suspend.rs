use std::sync::Arc;
use std::time::Duration;

use account_core::contract::{
    event_fingerprint, Account, AccountEvent, ContractError, LambdaResponse, ResponseError,
    ACCOUNT_ALREADY_SUSPENDED,
};
use account_core::fallback::{recompute_status, FallbackContext, FallbackError};
use account_core::resilience::{FallbackPolicy, PolicyConfig, PolicyError};
use serde_json::json;

use crate::adapters::invoke::{FunctionInvoker, InvokeError, LambdaFunctionService};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 20;
pub const DEFAULT_OPEN_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub enum SuspendError {
    /// The account is already suspended. Raised by the fallback's
    /// precondition double-check; the recovered variant of this condition
    /// never surfaces as an error from `apply`.
    AlreadySuspended,
    /// Unexpected remote failure, propagated into fallback dispatch.
    Invocation(InvokeError),
    /// The triggering event's payload violated the fallback contract.
    Contract(ContractError),
    /// Failure raised by the resilience policy itself.
    Policy(PolicyError),
}

impl std::fmt::Display for SuspendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadySuspended => f.write_str(ACCOUNT_ALREADY_SUSPENDED),
            Self::Invocation(error) => error.fmt(f),
            Self::Contract(error) => error.fmt(f),
            Self::Policy(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for SuspendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AlreadySuspended => None,
            Self::Invocation(error) => Some(error),
            Self::Contract(error) => Some(error),
            Self::Policy(error) => Some(error),
        }
    }
}

impl From<PolicyError> for SuspendError {
    fn from(error: PolicyError) -> Self {
        Self::Policy(error)
    }
}

impl From<FallbackError> for SuspendError {
    fn from(error: FallbackError) -> Self {
        match error {
            FallbackError::AlreadySuspended => Self::AlreadySuspended,
            FallbackError::Contract(error) => Self::Contract(error),
        }
    }
}

/// Suspends an account by invoking the remote suspension function, falling
/// back to a local status recomputation when the remote call fails.
pub struct SuspendAccount {
    function_service: Arc<dyn LambdaFunctionService + Send + Sync>,
    policy: FallbackPolicy,
}

impl SuspendAccount {
    /// The command's policy runs with the execution-timeout check disabled:
    /// suspension calls are never failed for running long, only circuit
    /// breaking and fallback-on-error apply.
    pub fn new(invoker: &FunctionInvoker) -> Self {
        Self::with_policy(
            invoker,
            FallbackPolicy::new(PolicyConfig::without_timeout(
                DEFAULT_FAILURE_THRESHOLD,
                DEFAULT_OPEN_INTERVAL,
            )),
        )
    }

    pub fn with_policy(invoker: &FunctionInvoker, policy: FallbackPolicy) -> Self {
        Self {
            function_service: invoker.lambda_function_service(),
            policy,
        }
    }

    /// Applies the suspension under the resilience policy. Any failure the
    /// primary call does not recover itself dispatches
    /// [`Self::account_suspended_fallback`] with the triggering failure.
    pub fn apply(&self, event: &AccountEvent) -> Result<LambdaResponse<Account>, SuspendError> {
        self.policy.execute(
            || self.invoke_suspension(event),
            |failure| self.account_suspended_fallback(event, failure),
        )
    }

    fn invoke_suspension(
        &self,
        event: &AccountEvent,
    ) -> Result<LambdaResponse<Account>, SuspendError> {
        match self.function_service.account_suspended(event) {
            Ok(account) => Ok(LambdaResponse::from_payload(account)),
            Err(InvokeError::AlreadySuspended) => {
                // Already in the desired state: recovered, not re-raised, so
                // the fallback is never dispatched for this outcome.
                Ok(LambdaResponse::from_error(ResponseError::already_suspended()))
            }
            Err(failure) => {
                log_command_error(
                    "remote_invocation_failed",
                    json!({
                        "event_type": event.event_type.as_str(),
                        "event_fingerprint": event_fingerprint(event),
                        "error": failure.to_string(),
                    }),
                );
                Err(SuspendError::Invocation(failure))
            }
        }
    }

    fn account_suspended_fallback(
        &self,
        event: &AccountEvent,
        failure: &SuspendError,
    ) -> Result<LambdaResponse<Account>, SuspendError> {
        log_command_info(
            "fallback_dispatched",
            json!({
                "event_type": event.event_type.as_str(),
                "event_fingerprint": event_fingerprint(event),
                "trigger": failure.to_string(),
            }),
        );

        let context = FallbackContext::from_event(event).map_err(SuspendError::Contract)?;
        let account = recompute_status(event, context)?;
        Ok(LambdaResponse::from_payload(account))
    }
}

fn log_command_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "suspend_account",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_command_error(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "suspend_account",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
