use serde_json::Value;
use tracing::info;
use untie::peer::IngestListener;
use untie::Untie;

use crate::cmd::ServeArgs;
use crate::exit::{peer_error, untie_error, CliResult, SUCCESS};
use crate::output::{print_listening, OutputFormat};

async fn sum(a: i64, b: i64) -> Result<i64, String> {
    a.checked_add(b)
        .ok_or_else(|| format!("{a} + {b} overflows a 64-bit integer"))
}

async fn echo(value: Value) -> Result<Value, String> {
    Ok(value)
}

async fn fail(message: String) -> Result<(), String> {
    Err(message)
}

/// Receiver instance exposing the built-in functions.
pub fn receiver(secret: &str) -> CliResult<Untie> {
    let instance =
        Untie::receiver(secret).map_err(|err| untie_error("invalid settings", err))?;
    untie::untie!(instance, sum).map_err(|err| untie_error("register failed", err))?;
    untie::untie!(instance, echo).map_err(|err| untie_error("register failed", err))?;
    untie::untie!(instance, fail).map_err(|err| untie_error("register failed", err))?;
    Ok(instance)
}

pub async fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let untie = receiver(&args.secret)?;
    let functions = untie.registry().identities();
    let mode = untie.mode();

    let listener =
        IngestListener::bind(&args.path, untie).map_err(|err| peer_error("bind failed", err))?;
    print_listening(listener.path(), mode.as_str(), &functions, format);

    listener
        .serve(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "signal handler setup failed; stopping");
            }
        })
        .await
        .map_err(|err| peer_error("serve failed", err))?;

    info!("receiver stopped");
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use untie::{CallPayload, CallResult};

    use super::*;

    #[tokio::test]
    async fn builtins_are_registered_by_name() {
        let untie = receiver("secret").unwrap();
        assert_eq!(untie.registry().identities(), vec!["echo", "fail", "sum"]);

        let result = untie
            .ingest("secret", CallPayload::new("sum", vec![json!(2), json!(40)]))
            .await
            .unwrap();
        assert_eq!(result, CallResult::ok(json!(42)));
    }

    #[tokio::test]
    async fn sum_reports_overflow_as_failure() {
        let untie = receiver("secret").unwrap();
        let result = untie
            .ingest(
                "secret",
                CallPayload::new("sum", vec![json!(i64::MAX), json!(1)]),
            )
            .await
            .unwrap();
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn fail_returns_its_message() {
        let untie = receiver("secret").unwrap();
        let result = untie
            .ingest("secret", CallPayload::new("fail", vec![json!("nope")]))
            .await
            .unwrap();
        assert_eq!(result, CallResult::error("nope"));
    }
}
