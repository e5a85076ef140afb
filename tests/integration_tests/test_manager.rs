// integration tests for the conditions manager through the public API

use std::cell::RefCell;
use std::rc::Rc;

use condwatch::conditions::{
    parse_conditions, ConditionState, ConditionStateManager, ConditionsEvaluationResult,
    ConditionsManager, StaticMediaQueries,
};
use serde_json::json;

fn record(manager: &ConditionsManager) -> Rc<RefCell<Vec<ConditionsEvaluationResult>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    manager.add_listener(Rc::new(move |evaluation: &ConditionsEvaluationResult| {
        sink.borrow_mut().push(evaluation.clone());
    }));
    seen
}

#[test]
fn test_configured_conditions_follow_state() {
    let conditions = parse_conditions(&json!([
        { "condition": "view", "views": ["live"] },
        { "entity": "binary_sensor.door", "state": "on" },
        { "condition": "screen", "media_query": "(orientation: landscape)" }
    ]))
    .unwrap();

    let source = Rc::new(ConditionStateManager::new());
    let media = Rc::new(StaticMediaQueries::new());
    let manager = ConditionsManager::builder(conditions)
        .state_source(source.clone())
        .media_queries(media.clone())
        .build()
        .unwrap();
    assert!(manager.has_state_dependent_conditions());
    let seen = record(&manager);

    source
        .apply_patch(
            json!({
                "view": "live",
                "state": { "binary_sensor.door": { "state": "on" } }
            })
            .as_object()
            .unwrap(),
        )
        .unwrap();
    // screen does not match yet
    assert!(seen.borrow().is_empty());

    media.set_matches("(orientation: landscape)", true).unwrap();
    assert_eq!(seen.borrow().len(), 1);
    assert!(seen.borrow()[0].result);

    source
        .apply_patch(json!({ "state": { "binary_sensor.door": { "state": "off" } } }).as_object().unwrap())
        .unwrap();
    assert_eq!(seen.borrow().len(), 2);
    assert_eq!(seen.borrow()[1], ConditionsEvaluationResult::new(false));
    assert_eq!(manager.get_evaluation(), ConditionsEvaluationResult::new(false));
}

#[test]
fn test_config_reference_changes() {
    let conditions = parse_conditions(&json!([
        { "condition": "config", "paths": ["menu.style"] }
    ]))
    .unwrap();

    let source = Rc::new(ConditionStateManager::new());
    source
        .set_state(ConditionState {
            config: Some(Rc::new(json!({ "menu": { "style": "hidden" }, "live": { "preload": false } }))),
            ..Default::default()
        })
        .unwrap();

    let manager = ConditionsManager::builder(conditions)
        .state_source(source.clone())
        .build()
        .unwrap();
    let seen = record(&manager);

    // an equal config keeps its reference and is not a change
    source
        .update(|s| s.config = Some(Rc::new(json!({ "menu": { "style": "hidden" }, "live": { "preload": false } }))))
        .unwrap();
    assert!(seen.borrow().is_empty());

    // an unwatched path changes: config transition reported, but no match
    source
        .update(|s| s.config = Some(Rc::new(json!({ "menu": { "style": "hidden" }, "live": { "preload": true } }))))
        .unwrap();
    let evaluation = manager.get_evaluation();
    assert!(!evaluation.result);

    // the watched path changes
    source
        .update(|s| s.config = Some(Rc::new(json!({ "menu": { "style": "overlay" }, "live": { "preload": true } }))))
        .unwrap();
    let seen = seen.borrow();
    let last = seen.last().unwrap();
    assert!(last.result);
    let config = last.trigger_data.as_ref().unwrap().config.as_ref().unwrap();
    assert_eq!(config.to.as_deref(), Some(&json!({ "menu": { "style": "overlay" }, "live": { "preload": true } })));
}

#[test]
fn test_key_and_microphone_conditions() {
    let conditions = parse_conditions(&json!([
        { "condition": "key", "key": "m", "ctrl": true },
        { "condition": "microphone", "connected": true, "muted": false }
    ]))
    .unwrap();

    let source = Rc::new(ConditionStateManager::new());
    let manager = ConditionsManager::builder(conditions)
        .state_source(source.clone())
        .build()
        .unwrap();

    source
        .apply_patch(
            json!({
                "keys": { "m": { "state": "down", "ctrl": true } },
                "microphone": { "connected": true, "muted": false }
            })
            .as_object()
            .unwrap(),
        )
        .unwrap();
    assert!(manager.get_evaluation().result);

    source
        .apply_patch(json!({ "keys": { "m": { "state": "up", "ctrl": true } } }).as_object().unwrap())
        .unwrap();
    assert!(!manager.get_evaluation().result);
}

#[test]
fn test_destroyed_manager_ignores_source() {
    let conditions = parse_conditions(&json!([{ "condition": "initialized" }])).unwrap();
    let source = Rc::new(ConditionStateManager::new());
    let manager = ConditionsManager::builder(conditions)
        .state_source(source.clone())
        .build()
        .unwrap();
    let seen = record(&manager);

    manager.destroy();
    source.update(|s| s.initialized = Some(true)).unwrap();

    assert!(seen.borrow().is_empty());
    assert_eq!(source.listener_count(), 0);
}

#[test]
fn test_media_loaded_needs_an_active_domain() {
    let conditions =
        parse_conditions(&json!([{ "condition": "media_loaded", "media_loaded": false }])).unwrap();

    let source = Rc::new(ConditionStateManager::new());
    let manager = ConditionsManager::builder(conditions)
        .state_source(source.clone())
        .build()
        .unwrap();
    assert!(!manager.get_evaluation().result);

    source.apply_patch(json!({ "view": "live" }).as_object().unwrap()).unwrap();
    assert!(!manager.get_evaluation().result);

    source
        .apply_patch(json!({ "media_loaded_info": false }).as_object().unwrap())
        .unwrap();
    assert!(manager.get_evaluation().result);

    source
        .apply_patch(json!({ "media_loaded_info": { "width": 1920, "height": 1080 } }).as_object().unwrap())
        .unwrap();
    assert!(!manager.get_evaluation().result);

    source
        .apply_patch(json!({ "media_loaded_info": null }).as_object().unwrap())
        .unwrap();
    assert!(!manager.get_evaluation().result);
}
