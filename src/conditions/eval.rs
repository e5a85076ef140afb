//! condition evaluator
//!
//! evaluates conditions against a new snapshot, the snapshot it replaced and
//! the live media query state. every evaluator is total over absent snapshot
//! fields: a missing field never matches. the one failure is an invalid
//! `user_agent_re` pattern, which is reported instead of silently not matching.

use std::rc::Rc;

use regex::Regex;
use serde_json::Value as JsonValue;

use super::error::ConditionsError;
use super::media_query::MediaQueryProvider;
use super::state::{ConditionState, KeyPressState};
use super::trigger::{ConditionsEvaluationResult, ConditionsTriggerData, StateTrigger, Transition};
use super::types::{
    CameraCondition, Condition, ConfigCondition, KeyCondition, MicrophoneCondition,
    NumericStateCondition, StateCondition, UserAgentCondition, ViewCondition,
};

/// marker present in the user agent of the companion apps
const COMPANION_USER_AGENT_MARKER: &str = "Home Assistant/";

/// context for evaluating conditions
#[derive(Clone, Copy, Default)]
pub struct EvalContext<'a> {
    /// snapshot being evaluated
    pub new_state: Option<&'a ConditionState>,
    /// snapshot it replaced
    pub old_state: Option<&'a ConditionState>,
    /// media query platform for `screen` conditions
    pub media: Option<&'a dyn MediaQueryProvider>,
}

impl<'a> EvalContext<'a> {
    /// create a new evaluation context
    pub fn new(new_state: Option<&'a ConditionState>) -> Self {
        Self {
            new_state,
            old_state: None,
            media: None,
        }
    }

    /// set the previous snapshot
    pub fn with_old_state(mut self, old_state: Option<&'a ConditionState>) -> Self {
        self.old_state = old_state;
        self
    }

    /// set the media query platform
    pub fn with_media(mut self, media: Option<&'a dyn MediaQueryProvider>) -> Self {
        self.media = media;
        self
    }
}

/// evaluate a list of conditions (AND, short-circuiting on the first failure)
///
/// trigger data is accumulated across the conditions evaluated; when the list
/// does not match, no trigger data is returned
pub fn evaluate_all(
    conditions: &[Condition],
    ctx: &EvalContext,
) -> Result<ConditionsEvaluationResult, ConditionsError> {
    let mut trigger_data = ConditionsTriggerData::default();

    for condition in conditions {
        let evaluation = evaluate(condition, ctx)?;
        tracing::trace!(condition = %condition, result = evaluation.result, "evaluated condition");

        if let Some(data) = evaluation.trigger_data {
            trigger_data.merge(data);
        }
        if !evaluation.result {
            return Ok(ConditionsEvaluationResult::new(false));
        }
    }

    if trigger_data.is_empty() {
        Ok(ConditionsEvaluationResult::new(true))
    } else {
        Ok(ConditionsEvaluationResult::with_trigger_data(true, trigger_data))
    }
}

/// evaluate a single condition against the given context
pub fn evaluate(
    condition: &Condition,
    ctx: &EvalContext,
) -> Result<ConditionsEvaluationResult, ConditionsError> {
    let new = ctx.new_state;

    let evaluation = match condition {
        Condition::State(c) => evaluate_state(c, ctx),
        Condition::View(c) => evaluate_view(c, ctx),
        Condition::Camera(c) => evaluate_camera(c, ctx),
        Condition::Fullscreen(c) => {
            matched(new.and_then(|s| s.fullscreen) == Some(c.fullscreen))
        }
        Condition::Expand(c) => matched(new.and_then(|s| s.expand) == Some(c.expand)),
        Condition::Interaction(c) => {
            matched(new.and_then(|s| s.interaction) == Some(c.interaction))
        }
        Condition::DisplayMode(c) => {
            matched(new.and_then(|s| s.display_mode) == Some(c.display_mode))
        }
        Condition::NumericState(c) => evaluate_numeric_state(c, ctx),
        Condition::User(c) => matched(
            new.and_then(|s| s.user.as_ref())
                .is_some_and(|user| c.users.contains(&user.id)),
        ),
        Condition::MediaLoaded(c) => matched(
            new.and_then(|s| s.media_loaded_info)
                .is_some_and(|info| info.is_some() == c.media_loaded),
        ),
        Condition::Screen(c) => matched(
            ctx.media
                .is_some_and(|media| media.match_media(&c.media_query).matches()),
        ),
        Condition::Triggered(c) => matched(
            new.and_then(|s| s.triggered.as_ref())
                .is_some_and(|triggered| c.triggered.iter().any(|id| triggered.contains(id))),
        ),
        Condition::Microphone(c) => evaluate_microphone(c, ctx),
        Condition::Key(c) => evaluate_key(c, ctx),
        Condition::UserAgent(c) => evaluate_user_agent(c, ctx)?,
        Condition::Config(c) => evaluate_config(c, ctx),
        Condition::Initialized => matched(new.and_then(|s| s.initialized).unwrap_or(false)),
    };

    Ok(evaluation)
}

fn matched(result: bool) -> ConditionsEvaluationResult {
    ConditionsEvaluationResult::new(result)
}

fn with_trigger(result: bool, trigger_data: Option<ConditionsTriggerData>) -> ConditionsEvaluationResult {
    ConditionsEvaluationResult {
        result,
        trigger_data,
    }
}

// ============================================================================
// Entity State Conditions
// ============================================================================

fn evaluate_state(c: &StateCondition, ctx: &EvalContext) -> ConditionsEvaluationResult {
    let from = ctx.old_state.and_then(|s| s.entity_state(&c.entity));
    let to = ctx.new_state.and_then(|s| s.entity_state(&c.entity));

    let result = if c.state.is_none() && c.state_not.is_none() {
        // no filter: any change matches
        from != to
    } else {
        match to.filter(|value| !value.is_empty()) {
            Some(value) => {
                c.state.as_ref().map_or(true, |set| set.contains(value))
                    && c.state_not.as_ref().map_or(true, |set| !set.contains(value))
            }
            None => false,
        }
    };

    let trigger_data = (from != to).then(|| ConditionsTriggerData {
        state: Some(StateTrigger {
            entity: c.entity.clone(),
            from: from.filter(|s| !s.is_empty()).map(String::from),
            to: to.filter(|s| !s.is_empty()).map(String::from),
        }),
        ..Default::default()
    });

    with_trigger(result, trigger_data)
}

fn evaluate_numeric_state(c: &NumericStateCondition, ctx: &EvalContext) -> ConditionsEvaluationResult {
    let value = match ctx.new_state.and_then(|s| s.entity_state(&c.entity)) {
        Some(value) => parse_number(value),
        None => return matched(false),
    };

    // bounds are exclusive; NaN never satisfies a bound
    let above_ok = c.above.map_or(true, |above| value > above);
    let below_ok = c.below.map_or(true, |below| value < below);
    matched(above_ok && below_ok)
}

/// numeric reading of a state string
///
/// blank strings read as zero. decimal literals, `Infinity` and unsigned
/// `0x`/`0o`/`0b` literals are accepted; anything else (including `inf` and
/// `nan`) reads as NaN.
fn parse_number(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(value) = parse_radix_literal(trimmed) {
        return value;
    }

    let unsigned = trimmed
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(trimmed);
    if unsigned == "Infinity" {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    // rust also parses `inf`, `infinity` and `nan`
    if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return f64::NAN;
    }

    trimmed.parse().unwrap_or(f64::NAN)
}

/// unsigned `0x`, `0o` or `0b` literal; `None` when there is no such prefix
fn parse_radix_literal(value: &str) -> Option<f64> {
    let radix = match value.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };

    let digits = &value[2..];
    if digits.is_empty() {
        return Some(f64::NAN);
    }
    let parsed = digits.chars().try_fold(0.0, |acc: f64, c| {
        c.to_digit(radix)
            .map(|digit| acc * f64::from(radix) + f64::from(digit))
    });
    Some(parsed.unwrap_or(f64::NAN))
}

// ============================================================================
// View / Camera Conditions
// ============================================================================

fn evaluate_view(c: &ViewCondition, ctx: &EvalContext) -> ConditionsEvaluationResult {
    let from = ctx.old_state.and_then(|s| s.view.as_deref());
    let to = ctx.new_state.and_then(|s| s.view.as_deref());

    let result = selection_matches(&c.views, from, to);
    let trigger_data = (from != to).then(|| ConditionsTriggerData {
        view: Transition::between_strings(from, to),
        ..Default::default()
    });

    with_trigger(result, trigger_data)
}

fn evaluate_camera(c: &CameraCondition, ctx: &EvalContext) -> ConditionsEvaluationResult {
    let from = ctx.old_state.and_then(|s| s.camera.as_deref());
    let to = ctx.new_state.and_then(|s| s.camera.as_deref());

    let result = selection_matches(&c.cameras, from, to);
    let trigger_data = (from != to).then(|| ConditionsTriggerData {
        camera: Transition::between_strings(from, to),
        ..Default::default()
    });

    with_trigger(result, trigger_data)
}

/// a selection matches when it is one of `allowed`, or when nothing is
/// allowed explicitly and the selection changed
fn selection_matches(allowed: &[String], from: Option<&str>, to: Option<&str>) -> bool {
    let in_allowed = to.is_some_and(|to| !to.is_empty() && allowed.iter().any(|a| a == to));
    in_allowed || (allowed.is_empty() && from != to)
}

// ============================================================================
// Device Conditions
// ============================================================================

fn evaluate_microphone(c: &MicrophoneCondition, ctx: &EvalContext) -> ConditionsEvaluationResult {
    let microphone = ctx.new_state.and_then(|s| s.microphone);
    let connected = microphone.and_then(|m| m.connected);
    let muted = microphone.and_then(|m| m.muted);

    matched(
        c.connected.map_or(true, |expected| connected == Some(expected))
            && c.muted.map_or(true, |expected| muted == Some(expected)),
    )
}

fn evaluate_key(c: &KeyCondition, ctx: &EvalContext) -> ConditionsEvaluationResult {
    let key = match ctx
        .new_state
        .and_then(|s| s.keys.as_ref())
        .and_then(|keys| keys.get(&c.key))
    {
        Some(key) => key,
        None => return matched(false),
    };

    let expected_state = c.state.unwrap_or(KeyPressState::Down);
    let modifier_ok = |expected: Option<bool>, actual: bool| expected.map_or(true, |e| e == actual);

    matched(
        key.state == expected_state
            && modifier_ok(c.ctrl, key.ctrl)
            && modifier_ok(c.alt, key.alt)
            && modifier_ok(c.meta, key.meta)
            && modifier_ok(c.shift, key.shift),
    )
}

fn evaluate_user_agent(
    c: &UserAgentCondition,
    ctx: &EvalContext,
) -> Result<ConditionsEvaluationResult, ConditionsError> {
    let user_agent = match ctx
        .new_state
        .and_then(|s| s.user_agent.as_deref())
        .filter(|ua| !ua.is_empty())
    {
        Some(ua) => ua,
        None => return Ok(matched(false)),
    };

    if let Some(expected) = c.user_agent.as_deref().filter(|ua| !ua.is_empty()) {
        if expected != user_agent {
            return Ok(matched(false));
        }
    }

    if let Some(companion) = c.companion {
        if companion != is_companion_app(user_agent) {
            return Ok(matched(false));
        }
    }

    if let Some(pattern) = &c.user_agent_re {
        let re = Regex::new(pattern).map_err(|source| ConditionsError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        if !re.is_match(user_agent) {
            return Ok(matched(false));
        }
    }

    Ok(matched(true))
}

/// check whether a user agent belongs to one of the companion apps
pub fn is_companion_app(user_agent: &str) -> bool {
    user_agent.contains(COMPANION_USER_AGENT_MARKER)
}

// ============================================================================
// Config Conditions
// ============================================================================

fn evaluate_config(c: &ConfigCondition, ctx: &EvalContext) -> ConditionsEvaluationResult {
    let old = ctx.old_state.and_then(|s| s.config.as_ref());
    let new = ctx.new_state.and_then(|s| s.config.as_ref());

    let changed = !same_reference(old, new);

    let result = match new {
        Some(new_config) if changed => {
            c.paths.is_empty()
                || c.paths.iter().any(|path| {
                    resolve_config_path(new_config, path)
                        != old.and_then(|old_config| resolve_config_path(old_config, path))
                })
        }
        _ => false,
    };

    let trigger_data = changed.then(|| ConditionsTriggerData {
        config: Some(Transition::new(old.cloned(), new.cloned())),
        ..Default::default()
    });

    with_trigger(result, trigger_data)
}

fn same_reference(a: Option<&Rc<JsonValue>>, b: Option<&Rc<JsonValue>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// resolve a dotted path (`a.b[0].c` or `a.b.0.c`) inside a config value
pub fn resolve_config_path<'a>(config: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut current = config;

    for segment in path_segments(path) {
        current = match current {
            JsonValue::Object(map) => map.get(segment)?,
            JsonValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(|c| c == '.' || c == '[' || c == ']')
        .filter(|segment| !segment.is_empty())
}
