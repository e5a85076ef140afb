//! core types for the condition system
//!
//! a [`Condition`] is a closed set of kinds, each carrying its own match
//! parameters. the serialized form is internally tagged on `condition` with
//! snake_case kind names, e.g. `{ "condition": "view", "views": ["live"] }`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::{DisplayMode, KeyPressState};

/// a single string or a list of strings (`"on"` or `["on", "open"]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringSet {
    One(String),
    Many(Vec<String>),
}

impl StringSet {
    /// check membership
    pub fn contains(&self, value: &str) -> bool {
        match self {
            StringSet::One(s) => s == value,
            StringSet::Many(list) => list.iter().any(|s| s == value),
        }
    }

    /// iterate over the members
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            StringSet::One(s) => std::slice::from_ref(s),
            StringSet::Many(list) => list,
        };
        items.iter().map(String::as_str)
    }
}

impl From<&str> for StringSet {
    fn from(value: &str) -> Self {
        StringSet::One(value.to_string())
    }
}

impl From<Vec<&str>> for StringSet {
    fn from(values: Vec<&str>) -> Self {
        StringSet::Many(values.into_iter().map(String::from).collect())
    }
}

impl fmt::Display for StringSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringSet::One(s) => write!(f, "\"{}\"", s),
            StringSet::Many(list) => {
                write!(f, "[")?;
                for (i, s) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\"", s)?;
                }
                write!(f, "]")
            }
        }
    }
}

// ============================================================================
// Per-kind parameters
// ============================================================================

/// entity state match (also the default for kind-less conditions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCondition {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StringSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_not: Option<StringSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewCondition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CameraCondition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cameras: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullscreenCondition {
    pub fullscreen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandCondition {
    pub expand: bool,
}

/// numeric entity state within exclusive bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStateCondition {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCondition {
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLoadedCondition {
    pub media_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenCondition {
    pub media_query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayModeCondition {
    pub display_mode: DisplayMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredCondition {
    pub triggered: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCondition {
    pub interaction: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MicrophoneCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
}

/// key press match; unspecified modifiers are not checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCondition {
    pub key: String,
    /// expected key state, `down` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<KeyPressState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserAgentCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent_re: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigCondition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

// ============================================================================
// Condition
// ============================================================================

/// one declarative rule in a conditions list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum Condition {
    State(StateCondition),
    View(ViewCondition),
    Fullscreen(FullscreenCondition),
    Expand(ExpandCondition),
    Camera(CameraCondition),
    NumericState(NumericStateCondition),
    User(UserCondition),
    MediaLoaded(MediaLoadedCondition),
    Screen(ScreenCondition),
    DisplayMode(DisplayModeCondition),
    Triggered(TriggeredCondition),
    Interaction(InteractionCondition),
    Microphone(MicrophoneCondition),
    Key(KeyCondition),
    UserAgent(UserAgentCondition),
    Config(ConfigCondition),
    Initialized,
}

impl Condition {
    /// every kind name accepted in the `condition` field
    pub const KINDS: &'static [&'static str] = &[
        "state",
        "view",
        "fullscreen",
        "expand",
        "camera",
        "numeric_state",
        "user",
        "media_loaded",
        "screen",
        "display_mode",
        "triggered",
        "interaction",
        "microphone",
        "key",
        "user_agent",
        "config",
        "initialized",
    ];

    /// kind name as written in configuration
    pub fn kind(&self) -> &'static str {
        match self {
            Condition::State(_) => "state",
            Condition::View(_) => "view",
            Condition::Fullscreen(_) => "fullscreen",
            Condition::Expand(_) => "expand",
            Condition::Camera(_) => "camera",
            Condition::NumericState(_) => "numeric_state",
            Condition::User(_) => "user",
            Condition::MediaLoaded(_) => "media_loaded",
            Condition::Screen(_) => "screen",
            Condition::DisplayMode(_) => "display_mode",
            Condition::Triggered(_) => "triggered",
            Condition::Interaction(_) => "interaction",
            Condition::Microphone(_) => "microphone",
            Condition::Key(_) => "key",
            Condition::UserAgent(_) => "user_agent",
            Condition::Config(_) => "config",
            Condition::Initialized => "initialized",
        }
    }

    /// whether this condition reads entity states or the current user
    ///
    /// lists without such conditions can ignore notifications that only
    /// carry entity state changes
    pub fn depends_on_entity_state(&self) -> bool {
        matches!(
            self,
            Condition::State(_) | Condition::NumericState(_) | Condition::User(_)
        )
    }

    /// media query this condition watches, if any
    pub fn media_query(&self) -> Option<&str> {
        match self {
            Condition::Screen(c) => Some(&c.media_query),
            _ => None,
        }
    }

    /// create a state condition
    pub fn state(entity: impl Into<String>, state: impl Into<StringSet>) -> Self {
        Condition::State(StateCondition {
            entity: entity.into(),
            state: Some(state.into()),
            state_not: None,
        })
    }

    /// create a state condition that excludes values
    pub fn state_not(entity: impl Into<String>, state_not: impl Into<StringSet>) -> Self {
        Condition::State(StateCondition {
            entity: entity.into(),
            state: None,
            state_not: Some(state_not.into()),
        })
    }

    /// create a view condition
    pub fn view<S: Into<String>>(views: impl IntoIterator<Item = S>) -> Self {
        Condition::View(ViewCondition {
            views: views.into_iter().map(Into::into).collect(),
        })
    }

    /// create a camera condition
    pub fn camera<S: Into<String>>(cameras: impl IntoIterator<Item = S>) -> Self {
        Condition::Camera(CameraCondition {
            cameras: cameras.into_iter().map(Into::into).collect(),
        })
    }

    /// create a fullscreen condition
    pub fn fullscreen(fullscreen: bool) -> Self {
        Condition::Fullscreen(FullscreenCondition { fullscreen })
    }

    /// create a screen (media query) condition
    pub fn screen(media_query: impl Into<String>) -> Self {
        Condition::Screen(ScreenCondition {
            media_query: media_query.into(),
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::State(c) => {
                write!(f, "state({}", c.entity)?;
                if let Some(state) = &c.state {
                    write!(f, " in {}", state)?;
                }
                if let Some(state_not) = &c.state_not {
                    write!(f, " not in {}", state_not)?;
                }
                write!(f, ")")
            }
            Condition::View(c) => write!(f, "view({})", c.views.join(", ")),
            Condition::Camera(c) => write!(f, "camera({})", c.cameras.join(", ")),
            Condition::Fullscreen(c) => write!(f, "fullscreen == {}", c.fullscreen),
            Condition::Expand(c) => write!(f, "expand == {}", c.expand),
            Condition::NumericState(c) => {
                write!(f, "numeric_state(")?;
                if let Some(above) = c.above {
                    write!(f, "{} < ", above)?;
                }
                write!(f, "{}", c.entity)?;
                if let Some(below) = c.below {
                    write!(f, " < {}", below)?;
                }
                write!(f, ")")
            }
            Condition::User(c) => write!(f, "user({})", c.users.join(", ")),
            Condition::MediaLoaded(c) => write!(f, "media_loaded == {}", c.media_loaded),
            Condition::Screen(c) => write!(f, "screen({})", c.media_query),
            Condition::DisplayMode(c) => write!(f, "display_mode == {}", c.display_mode),
            Condition::Triggered(c) => write!(f, "triggered({})", c.triggered.join(", ")),
            Condition::Interaction(c) => write!(f, "interaction == {}", c.interaction),
            Condition::Microphone(c) => {
                write!(f, "microphone(")?;
                let mut parts = Vec::new();
                if let Some(connected) = c.connected {
                    parts.push(format!("connected == {}", connected));
                }
                if let Some(muted) = c.muted {
                    parts.push(format!("muted == {}", muted));
                }
                write!(f, "{})", parts.join(", "))
            }
            Condition::Key(c) => write!(f, "key({})", c.key),
            Condition::UserAgent(_) => write!(f, "user_agent"),
            Condition::Config(c) => write!(f, "config({})", c.paths.join(", ")),
            Condition::Initialized => write!(f, "initialized"),
        }
    }
}
