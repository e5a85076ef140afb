//! condition state snapshots and the changes between them

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

// ============================================================================
// Snapshot Field Types
// ============================================================================

/// state of a single entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, JsonValue>,
}

impl EntityState {
    /// entity with a bare state value
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            attributes: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicrophoneState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
}

/// how media is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Single,
    Grid,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Single => write!(f, "single"),
            DisplayMode::Grid => write!(f, "grid"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPressState {
    #[default]
    Down,
    Up,
}

/// state of one key plus the modifiers held with it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardState {
    #[serde(default)]
    pub state: KeyPressState,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// dimensions of the currently loaded media
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaLoadedInfo {
    pub width: f64,
    pub height: f64,
}

/// `media_loaded_info` on the wire: the info object when loaded, `false` when
/// explicitly unloaded. `null` in a patch clears the field instead.
mod loaded_or_false {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::MediaLoadedInfo;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Flag(bool),
        Loaded(MediaLoadedInfo),
    }

    pub fn serialize<S>(value: &Option<Option<MediaLoadedInfo>>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(Some(info)) => info.serialize(s),
            Some(None) => s.serialize_bool(false),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Option<Option<MediaLoadedInfo>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Repr>::deserialize(d)? {
            None => Ok(None),
            Some(Repr::Loaded(info)) => Ok(Some(Some(info))),
            Some(Repr::Flag(false)) => Ok(Some(None)),
            Some(Repr::Flag(true)) => Err(D::Error::custom(
                "media_loaded_info must be an object or false",
            )),
        }
    }
}

// ============================================================================
// State Fields
// ============================================================================

/// named fields of a [`ConditionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    State,
    View,
    Fullscreen,
    Expand,
    Camera,
    Triggered,
    Interaction,
    Microphone,
    DisplayMode,
    Keys,
    UserAgent,
    Config,
    User,
    MediaLoadedInfo,
    Initialized,
}

impl StateField {
    /// all fields, in declaration order
    pub fn all() -> &'static [StateField] {
        &[
            StateField::State,
            StateField::View,
            StateField::Fullscreen,
            StateField::Expand,
            StateField::Camera,
            StateField::Triggered,
            StateField::Interaction,
            StateField::Microphone,
            StateField::DisplayMode,
            StateField::Keys,
            StateField::UserAgent,
            StateField::Config,
            StateField::User,
            StateField::MediaLoadedInfo,
            StateField::Initialized,
        ]
    }

    /// field name as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::State => "state",
            StateField::View => "view",
            StateField::Fullscreen => "fullscreen",
            StateField::Expand => "expand",
            StateField::Camera => "camera",
            StateField::Triggered => "triggered",
            StateField::Interaction => "interaction",
            StateField::Microphone => "microphone",
            StateField::DisplayMode => "display_mode",
            StateField::Keys => "keys",
            StateField::UserAgent => "user_agent",
            StateField::Config => "config",
            StateField::User => "user",
            StateField::MediaLoadedInfo => "media_loaded_info",
            StateField::Initialized => "initialized",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// point-in-time aggregate of every state domain conditions can reason about
///
/// every field is optional; absent means the domain is not active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionState {
    /// entity id -> entity state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<HashMap<String, EntityState>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullscreen: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand: Option<bool>,
    /// selected camera id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    /// ids of cameras currently triggered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered: Option<HashSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub microphone: Option<MicrophoneState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<DisplayMode>,
    /// key name -> key state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<HashMap<String, KeyboardState>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// shared so conditions can tell whether the reference changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Rc<JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// `Some(None)` is media explicitly unloaded, `None` the domain inactive
    #[serde(with = "loaded_or_false", skip_serializing_if = "Option::is_none")]
    pub media_loaded_info: Option<Option<MediaLoadedInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialized: Option<bool>,
}

impl ConditionState {
    /// state value of an entity, if the entity and its value are present
    pub fn entity_state(&self, entity: &str) -> Option<&str> {
        self.state
            .as_ref()
            .and_then(|states| states.get(entity))
            .and_then(|e| e.state.as_deref())
    }

    /// fields whose values differ between `self` and `other`
    pub fn diff(&self, other: &ConditionState) -> BTreeSet<StateField> {
        let mut changed = BTreeSet::new();

        macro_rules! compare {
            ($($field:ident => $name:ident),* $(,)?) => {
                $(
                    if self.$field != other.$field {
                        changed.insert(StateField::$name);
                    }
                )*
            };
        }

        compare!(
            state => State,
            view => View,
            fullscreen => Fullscreen,
            expand => Expand,
            camera => Camera,
            triggered => Triggered,
            interaction => Interaction,
            microphone => Microphone,
            display_mode => DisplayMode,
            keys => Keys,
            user_agent => UserAgent,
            config => Config,
            user => User,
            media_loaded_info => MediaLoadedInfo,
            initialized => Initialized,
        );

        changed
    }

    /// apply a JSON object patch: present keys replace, `null` clears
    pub fn merged_with(&self, patch: &Map<String, JsonValue>) -> Result<Self, serde_json::Error> {
        let mut current = match serde_json::to_value(self)? {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };

        for (key, value) in patch {
            if value.is_null() {
                current.remove(key);
            } else {
                current.insert(key.clone(), value.clone());
            }
        }

        serde_json::from_value(JsonValue::Object(current))
    }
}

/// notification describing a transition between two snapshots
#[derive(Debug, Clone, Default)]
pub struct ConditionStateChange {
    pub old: Option<Rc<ConditionState>>,
    pub new: Option<Rc<ConditionState>>,
    /// fields that differ between `old` and `new`; new values are read from `new`
    pub change: BTreeSet<StateField>,
}

impl ConditionStateChange {
    /// build a change between two snapshots, computing the changed fields
    pub fn between(old: Option<Rc<ConditionState>>, new: Rc<ConditionState>) -> Self {
        let change = match &old {
            Some(old) => old.diff(&new),
            None => ConditionState::default().diff(&new),
        };
        Self {
            old,
            new: Some(new),
            change,
        }
    }

    /// true when the only changed field is raw entity state
    pub fn is_entity_state_only(&self) -> bool {
        self.change.len() == 1 && self.change.contains(&StateField::State)
    }
}
