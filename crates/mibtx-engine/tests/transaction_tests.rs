//! SET transaction behaviour across objects

use mibtx_core::{ErrorStatus, Oid, Syntax, TimeTicks, Value};
use mibtx_engine::{
    EngineFault, IntegerRange, LengthRange, ManagedObject, ObjectStore, RequestContext, SetEngine,
    VarBind,
};
use mibtx_test_utils::{
    usm_row_index, FailingProtocol, ManualClock, RecordingObserver, SET_SERIAL_NO,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn serial() -> Oid {
    Oid::from(SET_SERIAL_NO)
}

fn sys_contact() -> Oid {
    Oid::from([1, 3, 6, 1, 2, 1, 1, 4, 0])
}

fn anonymous() -> RequestContext {
    RequestContext::anonymous()
}

#[test]
fn counter_accepts_matching_value_and_increments() {
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::test_and_incr(serial(), 41));
    let engine = SetEngine::new(store);

    let response = engine.set(&anonymous(), vec![VarBind::new(serial(), 41)]).unwrap();
    assert_eq!(response.status, ErrorStatus::NoError);
    assert_eq!(response.bindings, vec![VarBind::new(serial(), 41)]);
    assert_eq!(engine.get(&serial()), Ok(Value::from(42)));
}

#[test]
fn counter_rejects_stale_value_unchanged() {
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::test_and_incr(serial(), 5));
    let engine = SetEngine::new(store);

    let response = engine.set(&anonymous(), vec![VarBind::new(serial(), 4)]).unwrap();
    assert_eq!(response.status, ErrorStatus::InconsistentValue);
    assert_eq!(response.error_index, 1);
    assert_eq!(engine.get(&serial()), Ok(Value::from(5)));
}

#[test]
fn counter_wraps_after_max() {
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::test_and_incr(serial(), i32::MAX));
    let engine = SetEngine::new(store);

    let response = engine
        .set(&anonymous(), vec![VarBind::new(serial(), i32::MAX)])
        .unwrap();
    assert!(response.is_success());
    assert_eq!(response.bindings[0].value, Value::from(i32::MAX));
    assert_eq!(engine.get(&serial()), Ok(Value::from(0)));
}

#[test]
fn counter_rejects_wrong_type() {
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::test_and_incr(serial(), 0));
    let engine = SetEngine::new(store);

    let response = engine.set(&anonymous(), vec![VarBind::new(serial(), "0")]).unwrap();
    assert_eq!(response.status, ErrorStatus::WrongType);
    assert_eq!(
        engine.store().resolve(&serial()).unwrap().propose_value(&Value::from("0")),
        Err(mibtx_core::RequestError::WrongType {
            expected: Syntax::Integer,
            actual: Syntax::OctetString,
        })
    );
}

#[test]
fn check_failure_mutates_nothing() {
    let observer = RecordingObserver::new();
    let level = Oid::from([1, 3, 6, 1, 4, 1, 99, 2, 0]);
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::test_and_incr(serial(), 0).with_observer(observer.clone()));
    store.register(
        ManagedObject::plain(sys_contact(), "noc@example.net")
            .with_constraint(LengthRange::display_string())
            .with_observer(observer.clone()),
    );
    store.register(ManagedObject::plain(level.clone(), 3).with_constraint(IntegerRange::new(1, 5)));
    let engine = SetEngine::new(store);

    let response = engine
        .set(
            &anonymous(),
            vec![
                VarBind::new(serial(), 0),
                VarBind::new(sys_contact(), "ops@example.net"),
                VarBind::new(level.clone(), 6),
            ],
        )
        .unwrap();
    assert_eq!(response.status, ErrorStatus::WrongValue);
    assert_eq!(response.error_index, 3);
    assert_eq!(engine.get(&serial()), Ok(Value::from(0)));
    assert_eq!(engine.get(&sys_contact()), Ok(Value::from("noc@example.net")));
    assert_eq!(engine.get(&level), Ok(Value::from(3)));
    assert!(observer.changes().is_empty());
}

#[test]
fn commit_failure_undoes_committed_siblings() {
    let observer = RecordingObserver::new();
    let broken_key = Oid::from([1, 3, 6, 1, 6, 3, 15, 1, 2, 2, 1, 6]).append(&usm_row_index("ops"));
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::test_and_incr(serial(), 7).with_observer(observer.clone()));
    store.register(ManagedObject::plain(sys_contact(), "before").with_observer(observer.clone()));
    store.register(ManagedObject::key_change(
        broken_key.clone(),
        FailingProtocol::new(16),
        usm_row_index("ops"),
        vec![0xaa; 16],
    ));
    let engine = SetEngine::new(store);

    let response = engine
        .set(
            &anonymous(),
            vec![
                VarBind::new(serial(), 7),
                VarBind::new(sys_contact(), "after"),
                VarBind::new(broken_key.clone(), vec![0x01u8; 32]),
            ],
        )
        .unwrap();
    assert_eq!(response.status, ErrorStatus::CommitFailed);
    assert_eq!(response.error_index, 3);
    assert_eq!(engine.get(&serial()), Ok(Value::from(7)));
    assert_eq!(engine.get(&sys_contact()), Ok(Value::from("before")));
    assert_eq!(
        engine.store().resolve(&broken_key).unwrap().current_value(),
        Value::from(vec![0xaau8; 16])
    );

    // commit in request order, undo in reverse
    assert_eq!(
        observer.changes(),
        vec![
            (serial(), Value::from(7), Value::from(8)),
            (sys_contact(), Value::from("before"), Value::from("after")),
            (sys_contact(), Value::from("after"), Value::from("before")),
            (serial(), Value::from(8), Value::from(7)),
        ]
    );
}

#[test]
fn locks_are_released_after_failure() {
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::test_and_incr(serial(), 0));
    let engine = SetEngine::new(store);

    let stale = engine.set(&anonymous(), vec![VarBind::new(serial(), 9)]).unwrap();
    assert!(!stale.is_success());
    let fresh = engine.set(&anonymous(), vec![VarBind::new(serial(), 0)]).unwrap();
    assert!(fresh.is_success());
}

#[test]
fn time_stamp_without_source_is_fault() {
    let uptime = Oid::from([1, 3, 6, 1, 2, 1, 1, 8, 0]);
    let stamp = ManagedObject::time_stamp(uptime.clone(), None);
    assert_eq!(
        stamp.update_stamp(),
        Err(EngineFault::Configuration {
            oid: uptime,
            missing: "time source",
        })
    );
}

#[test]
fn time_stamp_tracks_source_and_refuses_set() {
    let clock = ManualClock::at(100);
    let uptime = Oid::from([1, 3, 6, 1, 2, 1, 1, 8, 0]);
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::time_stamp(uptime.clone(), Some(clock.clone())));
    let engine = SetEngine::new(store);

    let object = engine.store().resolve(&uptime).unwrap();
    assert_eq!(object.update_stamp(), Ok(TimeTicks(100)));
    clock.advance(250);
    assert_eq!(object.update_stamp(), Ok(TimeTicks(350)));
    assert_eq!(engine.get(&uptime), Ok(Value::from(TimeTicks(350))));

    let response = engine
        .set(&anonymous(), vec![VarBind::new(uptime.clone(), TimeTicks(1))])
        .unwrap();
    assert_eq!(response.status, ErrorStatus::NotWritable);
    assert_eq!(engine.get(&uptime), Ok(Value::from(TimeTicks(350))));
}

#[test]
fn racing_writers_each_increment_once() {
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::test_and_incr(serial(), 0));
    let engine = SetEngine::new(store);

    let accepted: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = &engine;
                scope.spawn(move || {
                    let mut accepted = 0;
                    for _ in 0..200 {
                        let Ok(Value::Integer(seen)) = engine.get(&serial()) else {
                            panic!("counter is not an integer");
                        };
                        let response = engine
                            .set(&anonymous(), vec![VarBind::new(serial(), seen)])
                            .unwrap();
                        if response.is_success() {
                            accepted += 1;
                        } else {
                            assert_eq!(response.status, ErrorStatus::InconsistentValue);
                        }
                    }
                    accepted
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert!(accepted > 0);
    assert_eq!(engine.get(&serial()), Ok(Value::from(i32::try_from(accepted).unwrap())));
}

#[test]
fn batches_locking_in_opposite_order_do_not_deadlock() {
    let a = Oid::from([1, 3, 6, 1, 4, 1, 99, 10, 0]);
    let b = Oid::from([1, 3, 6, 1, 4, 1, 99, 11, 0]);
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::plain(a.clone(), 0));
    store.register(ManagedObject::plain(b.clone(), 0));
    let engine = SetEngine::new(store);

    std::thread::scope(|scope| {
        for t in 0..4 {
            let (engine, a, b) = (&engine, a.clone(), b.clone());
            scope.spawn(move || {
                for i in 0..200 {
                    let batch = if t % 2 == 0 {
                        vec![VarBind::new(a.clone(), i), VarBind::new(b.clone(), i)]
                    } else {
                        vec![VarBind::new(b.clone(), i), VarBind::new(a.clone(), i)]
                    };
                    assert!(engine.set(&RequestContext::anonymous(), batch).unwrap().is_success());
                }
            });
        }
    });
    assert_eq!(engine.get(&a), Ok(Value::from(199)));
    assert_eq!(engine.get(&b), Ok(Value::from(199)));
}
