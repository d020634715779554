//! CLI smoke entry point for the model layer.
//!
//! # Responsibility
//! - Project a ship payload through `modelkit_core` and print the wire JSON.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `modelkit_cli [payload.json] [include]`. `include` is JSON
//! (`'{"ship":{"include":"ships"}}'`) or a bare association name.
//! `MODELKIT_CONFIG` may point to a core config file enabling file logging.

use log::info;
use modelkit_core::{
    core_version, CoreConfig, FieldRule, JsonOptions, ModelDeclaration, ModelRegistry, TYPE_DATE,
};
use serde_json::{json, Value as JsonValue};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("modelkit_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = load_config()?;
    config.init_logging().map_err(|err| err.to_string())?;
    println!("modelkit_core version={}", core_version());

    let mut args = std::env::args().skip(1);
    let payload = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|err| format!("failed to read `{path}`: {err}"))?;
            serde_json::from_str(&text).map_err(|err| format!("invalid payload json: {err}"))?
        }
        None => sample_payload(),
    };
    let include = match args.next() {
        Some(raw) => serde_json::from_str(&raw).unwrap_or(JsonValue::String(raw)),
        None => JsonValue::Null,
    };

    let mut registry = ModelRegistry::with_config(&config, Default::default());
    registry
        .declare_with_collection(
            ModelDeclaration::new("ship")
                .belongs_to("ship")
                .has_many("ships")
                .field("date", FieldRule::new(TYPE_DATE)),
        )
        .map_err(|err| err.to_string())?;

    let ship = registry
        .instantiate_json("ship", payload)
        .map_err(|err| err.to_string())?;
    let projection = ship
        .to_json(&JsonOptions::from_include(&include))
        .map_err(|err| err.to_string())?;
    info!(
        "event=cli_project module=cli status=ok model={} include={}",
        ship.model_name(),
        include
    );

    let rendered = serde_json::to_string_pretty(&projection).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn load_config() -> Result<CoreConfig, String> {
    match std::env::var("MODELKIT_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|err| format!("failed to read config `{path}`: {err}"))?;
            CoreConfig::from_json_str(&text).map_err(|err| err.to_string())
        }
        Err(_) => Ok(CoreConfig::default()),
    }
}

fn sample_payload() -> JsonValue {
    json!({
        "foo": "bar",
        "ship": {"bat": "baz", "ship": {"bing": "bong", "ships": []}},
        "ships": [{"ping": "pong", "ship": {"bing": "bong"}}, {"ships": []}],
        "date": "2013-04-10T21:24:28.000Z"
    })
}
