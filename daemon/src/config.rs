use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use crate::error::StartupError;

pub const ON_ATTACH_KEY: &str = "onattach";
pub const ON_DETACH_KEY: &str = "ondetach";

/// Root configuration structure, deserialized from the JSON file named on the
/// command line:
///
/// ```json
/// { "onattach": {"turn_on_leds": "some-command --on"},
///   "ondetach": {"turn_off_leds": "some-command --off"} }
/// ```
///
/// Both sections are optional. A section that is present but not an object is
/// treated as empty rather than as an error.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(rename = "onattach", default, deserialize_with = "on_attach_actions")]
    pub on_attach: ActionMap,
    #[serde(rename = "ondetach", default, deserialize_with = "on_detach_actions")]
    pub on_detach: ActionMap,
}

/// A single configured action: a label used only in log lines and a shell
/// command passed verbatim to the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub label: String,
    pub command: String,
}

/// Actions for one event kind, in the order they appear in the config file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActionMap(Vec<Action>);

impl ActionMap {
    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds the map for `key` from an arbitrary JSON value. Anything other
    /// than an object yields an empty map; entries whose command is not a
    /// string are skipped.
    fn from_value(key: &str, value: Value) -> Self {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Self::default(),
            other => {
                warn!("'{key}' is not an object ({}), no actions will run for it", json_kind(&other));
                return Self::default();
            }
        };

        let actions = object
            .into_iter()
            .filter_map(|(label, command)| match command {
                Value::String(command) => Some(Action { label, command }),
                other => {
                    warn!(
                        "{key} action '{label}' has a {} instead of a command string, skipping",
                        json_kind(&other)
                    );
                    None
                }
            })
            .collect();
        Self(actions)
    }
}

impl<'a> IntoIterator for &'a ActionMap {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Config {
    /// Parses a config document. Fails only on malformed JSON; a well-formed
    /// document of the wrong shape produces an empty config.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            warn!("Config root is not an object ({}), no actions will run", json_kind(&value));
            return Ok(Self::default());
        }
        Config::deserialize(value)
    }

    /// True when neither event kind has any action configured.
    pub fn is_empty(&self) -> bool {
        self.on_attach.is_empty() && self.on_detach.is_empty()
    }
}

/// Loads the config file at `path`.
///
/// Unlike a missing optional setting, a missing file is an error here: the
/// daemon has nothing to do without one.
pub fn load(path: &Path) -> Result<Config, StartupError> {
    if !path.is_file() {
        return Err(StartupError::ConfigNotFound(path.to_path_buf()));
    }

    info!("Loading config from file: '{}'", path.display());
    let content = std::fs::read_to_string(path).map_err(|source| StartupError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config = Config::from_json(&content).map_err(|source| StartupError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        "Loaded {} {ON_ATTACH_KEY} and {} {ON_DETACH_KEY} action(s)",
        config.on_attach.len(),
        config.on_detach.len()
    );
    Ok(config)
}

fn on_attach_actions<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ActionMap, D::Error> {
    Value::deserialize(deserializer).map(|v| ActionMap::from_value(ON_ATTACH_KEY, v))
}

fn on_detach_actions<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ActionMap, D::Error> {
    Value::deserialize(deserializer).map(|v| ActionMap::from_value(ON_DETACH_KEY, v))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
