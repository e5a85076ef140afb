use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// conditions file contents
///
/// conditions are kept as raw JSON here and parsed separately so that parse
/// errors can be reported with their position in the list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionsFile {
    pub conditions: Vec<JsonValue>,
    /// initial match state of media queries used by `screen` conditions
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub media_queries: BTreeMap<String, bool>,
    /// snapshot patch applied before replaying input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<Map<String, JsonValue>>,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// print the seeded evaluation before replaying
    #[serde(default)]
    pub print_initial: bool,
}

/// a conditions file is either the full object or a bare list of conditions
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RawConditionsFile {
    Full(ConditionsFile),
    List(Vec<JsonValue>),
}

impl From<RawConditionsFile> for ConditionsFile {
    fn from(raw: RawConditionsFile) -> Self {
        match raw {
            RawConditionsFile::Full(file) => file,
            RawConditionsFile::List(conditions) => ConditionsFile {
                conditions,
                ..Default::default()
            },
        }
    }
}
