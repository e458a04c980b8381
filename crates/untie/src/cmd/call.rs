use serde_json::Value;
use untie::peer::{HandshakeConfig, SocketTransporter, SocketTransporterConfig};
use untie::{CallPayload, CallResult, Untie};

use crate::cmd::{parse_duration, CallArgs};
use crate::exit::{untie_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_result, OutputFormat};

pub async fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let call_args = parse_args(&args.args)?;

    let transporter = SocketTransporter::new(&args.path).with_config(SocketTransporterConfig {
        handshake: HandshakeConfig {
            timeout,
            ..HandshakeConfig::default()
        },
        call_timeout: Some(timeout),
        ..SocketTransporterConfig::default()
    });
    let untie = Untie::initiator(args.secret, transporter)
        .map_err(|err| untie_error("invalid settings", err))?;

    let result = untie
        .invoke(CallPayload::new(args.identity.as_str(), call_args))
        .await
        .map_err(|err| untie_error("call failed", err))?;

    match result {
        CallResult::Ok(value) => {
            print_result(&args.identity, &value, format);
            Ok(SUCCESS)
        }
        CallResult::Error(descriptor) => Err(CliError::new(
            FAILURE,
            format!("{} failed: {}", args.identity, descriptor.message),
        )),
    }
}

fn parse_args(raw: &str) -> CliResult<Vec<Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(CliError::new(USAGE, "--args must be a JSON array")),
        Err(err) => Err(CliError::new(
            USAGE,
            format!("--args is not valid JSON: {err}"),
        )),
    }
}
