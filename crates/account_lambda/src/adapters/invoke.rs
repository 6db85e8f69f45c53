use std::sync::Arc;

use account_core::contract::{Account, AccountEvent, ACCOUNT_ALREADY_SUSPENDED};

/// Failure of a remote suspension invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The remote function reported the one expected failure: the account is
    /// already suspended. Recoverable.
    AlreadySuspended,
    /// Any other failure reported by the remote function itself.
    Function { message: String },
    /// The invocation never produced a function result (SDK, network, or
    /// payload decoding failure).
    Transport { message: String },
}

impl InvokeError {
    /// Classifies a failure message reported by the remote function. The
    /// exact comparison against [`ACCOUNT_ALREADY_SUSPENDED`] happens here
    /// and nowhere else; everything downstream works with the variant.
    pub fn from_function_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message == ACCOUNT_ALREADY_SUSPENDED {
            Self::AlreadySuspended
        } else {
            Self::Function { message }
        }
    }
}

impl std::fmt::Display for InvokeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadySuspended => f.write_str(ACCOUNT_ALREADY_SUSPENDED),
            Self::Function { message } | Self::Transport { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for InvokeError {}

/// The function-invocation collaborator: performs the actual suspension
/// business logic remotely and returns the suspended account.
pub trait LambdaFunctionService {
    fn account_suspended(&self, event: &AccountEvent) -> Result<Account, InvokeError>;
}

/// Construction-time provider handed to commands; its only job is to yield
/// the function-invocation collaborator.
pub struct FunctionInvoker {
    service: Arc<dyn LambdaFunctionService + Send + Sync>,
}

impl FunctionInvoker {
    pub fn new(service: Arc<dyn LambdaFunctionService + Send + Sync>) -> Self {
        Self { service }
    }

    pub fn lambda_function_service(&self) -> Arc<dyn LambdaFunctionService + Send + Sync> {
        self.service.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_message_classifies_as_already_suspended() {
        let error = InvokeError::from_function_message("Account already suspended");
        assert_eq!(error, InvokeError::AlreadySuspended);
        assert_eq!(error.to_string(), "Account already suspended");
    }

    #[test]
    fn near_miss_messages_stay_ordinary_function_failures() {
        for message in [
            "account already suspended",
            "Account already suspended.",
            " Account already suspended",
            "Account suspended",
        ] {
            let error = InvokeError::from_function_message(message);
            assert_eq!(
                error,
                InvokeError::Function {
                    message: message.to_string()
                }
            );
            assert_eq!(error.to_string(), message);
        }
    }
}
