use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use ux300_terminal::TerminalEvent;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a TerminalEvent,
}

#[derive(Serialize)]
struct AckOutput<'a> {
    timestamp: String,
    command: &'a str,
    acknowledged: bool,
}

pub fn print_event(event: &TerminalEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                timestamp: now_unix_seconds(),
                event,
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
                .set_header(vec!["EVENT", event.name()]);
            for (field, value) in event_fields(event) {
                table.add_row(vec![field, value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut summary = vec![event.name().to_string()];
            let mut lines = Vec::new();
            for (field, value) in event_fields(event) {
                if value.contains('\n') {
                    lines.push(value);
                } else {
                    summary.push(format!("{field}={value}"));
                }
            }
            println!("{}", summary.join(" "));
            for block in lines {
                println!("{block}");
            }
        }
    }
}

pub fn print_ack(command: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = AckOutput {
                timestamp: now_unix_seconds(),
                command,
                acknowledged: true,
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
                .set_header(vec!["COMMAND", "ACKNOWLEDGED"])
                .add_row(vec![command, "yes"]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{command}: acknowledged"),
    }
}

/// Flatten an event's payload into `(field, value)` pairs.
///
/// Nested objects use dotted names; string arrays (vouchers, reports) become
/// one newline-joined value.
pub fn event_fields(event: &TerminalEvent) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    if let Ok(Value::Object(map)) = serde_json::to_value(event) {
        for (key, value) in map {
            if key != "event" {
                flatten(&key, value, &mut fields);
            }
        }
    }
    fields
}

fn flatten(prefix: &str, value: Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                flatten(&format!("{prefix}.{key}"), value, out);
            }
        }
        Value::Array(items) => {
            let lines: Vec<String> = items.iter().map(scalar).collect();
            out.push((prefix.to_string(), lines.join("\n")));
        }
        other => out.push((prefix.to_string(), scalar(&other))),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
