use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CallOutput<'a> {
    identity: &'a str,
    result: &'a Value,
    timestamp: String,
}

#[derive(Serialize)]
struct ServeOutput<'a> {
    socket: String,
    mode: &'a str,
    functions: &'a [String],
}

/// Print the value a remote call returned.
pub fn print_result(identity: &str, result: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = CallOutput {
                identity,
                result,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["IDENTITY", "RESULT"])
                .add_row(vec![identity.to_string(), result.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let pretty =
                serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
            println!("{identity} =>\n{pretty}");
        }
        OutputFormat::Raw => print_raw(result.to_string().as_bytes()),
    }
}

/// Announce a listening receiver and the identities it serves.
pub fn print_listening(socket: &Path, mode: &str, functions: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ServeOutput {
                socket: socket.display().to_string(),
                mode,
                functions,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SOCKET", "MODE", "FUNCTION"]);
            for function in functions {
                table.add_row(vec![
                    socket.display().to_string(),
                    mode.to_string(),
                    function.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "listening on {} ({mode}): {}",
                socket.display(),
                functions.join(", ")
            );
        }
    }
    let _ = std::io::stdout().flush();
}

fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
