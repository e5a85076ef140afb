//! condition evaluation engine
//!
//! evaluates a declarative list of conditions against a stream of state
//! snapshots and notifies listeners when the aggregate result changes:
//! - conditions are a closed set of kinds (`state`, `view`, `screen`, ...)
//! - a list matches when every condition matches (short-circuiting AND)
//! - each evaluation may carry trigger data describing what changed
//!
//! [`ConditionsManager`] is the entry point; it consumes a
//! [`ConditionStateSource`] and an optional [`MediaQueryProvider`].

mod error;
mod eval;
mod listeners;
mod manager;
mod media_query;
mod parser;
mod source;
mod state;
mod trigger;
mod types;

pub use error::ConditionsError;
pub use eval::{evaluate, evaluate_all, is_companion_app, resolve_config_path, EvalContext};
pub use listeners::{ListenerId, ListenerRegistry};
pub use manager::{ConditionsListener, ConditionsManager, ConditionsManagerBuilder};
pub use media_query::{
    MediaQueryHandler, MediaQueryList, MediaQueryProvider, StaticMediaQueries, StaticMediaQueryList,
};
pub use parser::{parse_condition, parse_conditions, ParseError};
pub use source::{ConditionStateManager, ConditionStateSource, StateChangeHandler};
pub use state::{
    ConditionState, ConditionStateChange, DisplayMode, EntityState, KeyPressState, KeyboardState,
    MediaLoadedInfo, MicrophoneState, StateField, User,
};
pub use trigger::{ConditionsEvaluationResult, ConditionsTriggerData, StateTrigger, Transition};
pub use types::{
    CameraCondition, Condition, ConfigCondition, DisplayModeCondition, ExpandCondition,
    FullscreenCondition, InteractionCondition, KeyCondition, MediaLoadedCondition,
    MicrophoneCondition, NumericStateCondition, ScreenCondition, StateCondition, StringSet,
    TriggeredCondition, UserAgentCondition, UserCondition, ViewCondition,
};
