use std::sync::Arc;
use std::time::Duration;

use account_core::contract::{Account, AccountEvent, LambdaResponse};
use account_core::resilience::{FallbackPolicy, PolicyConfig};
use account_lambda::adapters::invoke::{FunctionInvoker, InvokeError, LambdaFunctionService};
use account_lambda::handlers::suspend::{
    SuspendAccount, DEFAULT_FAILURE_THRESHOLD, DEFAULT_OPEN_INTERVAL,
};
use aws_sdk_lambda::types::InvocationType;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct AwsLambdaFunctionService {
    lambda_client: aws_sdk_lambda::Client,
    function_name: String,
}

impl LambdaFunctionService for AwsLambdaFunctionService {
    fn account_suspended(&self, event: &AccountEvent) -> Result<Account, InvokeError> {
        let request_payload = serde_json::to_vec(event).map_err(|error| InvokeError::Transport {
            message: format!("failed to serialize suspension request: {error}"),
        })?;
        let client = self.lambda_client.clone();
        let function_name = self.function_name.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .invoke()
                    .function_name(function_name)
                    .invocation_type(InvocationType::RequestResponse)
                    .set_payload(Some(request_payload.into()))
                    .send()
                    .await
                    .map_err(|error| InvokeError::Transport {
                        message: format!("failed to invoke suspension function: {error}"),
                    })?;

                let response_payload = output
                    .payload()
                    .map(|blob| blob.as_ref().to_vec())
                    .unwrap_or_default();

                if output.function_error().is_some() {
                    return Err(InvokeError::from_function_message(function_error_message(
                        &response_payload,
                    )));
                }

                serde_json::from_slice::<Account>(&response_payload).map_err(|error| {
                    InvokeError::Transport {
                        message: format!(
                            "suspension function returned an unreadable account: {error}"
                        ),
                    }
                })
            })
        })
    }
}

// Lambda function errors arrive as a JSON document with an `errorMessage`
// field; the raw payload is the message of last resort.
fn function_error_message(payload: &[u8]) -> String {
    serde_json::from_slice::<Value>(payload)
        .ok()
        .and_then(|value| {
            value
                .get("errorMessage")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(payload).into_owned())
}

fn breaker_from_env() -> FallbackPolicy {
    let failure_threshold = std::env::var("SUSPEND_BREAKER_THRESHOLD")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_FAILURE_THRESHOLD);
    let open_interval = std::env::var("SUSPEND_BREAKER_OPEN_SECS")
        .ok()
        .and_then(|value| value.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_OPEN_INTERVAL);

    FallbackPolicy::new(PolicyConfig::without_timeout(failure_threshold, open_interval))
}

async fn handle_request(
    command: &SuspendAccount,
    event: LambdaEvent<Value>,
) -> Result<LambdaResponse<Account>, Error> {
    let account_event: AccountEvent = serde_json::from_value(event.payload)
        .map_err(|error| Error::from(format!("invalid account event: {error}")))?;

    command
        .apply(&account_event)
        .map_err(|error| Error::from(error.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let function_name = std::env::var("SUSPEND_ACCOUNT_FUNCTION_ARN")
        .map_err(|_| Error::from("SUSPEND_ACCOUNT_FUNCTION_ARN must be configured"))?;

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let service = AwsLambdaFunctionService {
        lambda_client: aws_sdk_lambda::Client::new(&config),
        function_name,
    };
    let invoker = FunctionInvoker::new(Arc::new(service));
    // Built once: breaker state must span invocations of this Lambda.
    let command = Arc::new(SuspendAccount::with_policy(&invoker, breaker_from_env()));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let command = command.clone();
        async move { handle_request(&command, event).await }
    }))
    .await
}
