#![forbid(unsafe_code)]

//! End-to-end scenarios for `combine`: source-group shapes, passive
//! semantics, end rules, error transparency, and glitch-free propagation
//! through diamond-shaped graphs.

mod common;

use rill::{Combined, Event, Sources, combine, combine_values, property, stream};

use common::{ended_property_with, ended_stream, record, taken};

fn list(values: &[i32]) -> Event<Combined<i32>, &'static str> {
    Event::Value(Combined::List(values.to_vec()))
}

fn named(pairs: &[(&str, i32)]) -> Event<Combined<i32>, &'static str> {
    Event::Value(Combined::Named(
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    ))
}

#[test]
fn three_active_sources_full_scenario() {
    let (a, ea) = stream::<i32, &'static str>();
    let (b, eb) = property::<i32, &'static str>();
    eb.emit(0);
    let (c, ec) = stream::<i32, &'static str>();
    let cb = combine_values(Sources::list([a, b, c]), Sources::empty()).unwrap();
    let (log, _sub) = record(&cb);

    ea.emit(1);
    assert!(log.borrow().is_empty(), "c has no value yet");
    ec.emit(2);
    eb.emit(3);
    ea.end();
    eb.emit(4);
    eb.end();
    ec.emit(5);
    ec.emit(6);
    ec.end();
    assert_eq!(
        taken(&log),
        vec![
            list(&[1, 0, 2]),
            list(&[1, 3, 2]),
            list(&[1, 4, 2]),
            list(&[1, 4, 5]),
            list(&[1, 4, 6]),
            Event::End,
        ]
    );
}

#[test]
fn two_active_two_passive_scenario() {
    let (a, ea) = stream::<i32, &'static str>();
    let (b, eb) = property::<i32, &'static str>();
    eb.emit(0);
    let (c, ec) = stream::<i32, &'static str>();
    let (d, ed) = stream::<i32, &'static str>();
    let cb = combine_values(Sources::list([c, d]), Sources::list([a, b])).unwrap();
    let (log, _sub) = record(&cb);

    ea.emit(1);
    ec.emit(2);
    assert!(log.borrow().is_empty(), "d has no value yet");
    ed.emit(3);
    eb.emit(4);
    eb.end(); // passive end is silent
    ec.emit(5);
    ec.emit(6);
    ec.end(); // d still live
    ed.emit(7);
    ed.end();
    assert_eq!(
        taken(&log),
        vec![
            list(&[2, 3, 1, 0]),
            list(&[5, 3, 1, 4]),
            list(&[6, 3, 1, 4]),
            list(&[6, 7, 1, 4]),
            Event::End,
        ]
    );
}

#[test]
fn named_groups_full_scenario() {
    let (a, ea) = stream::<i32, &'static str>();
    let (b, eb) = property::<i32, &'static str>();
    eb.emit(0);
    let (c, ec) = stream::<i32, &'static str>();
    let cb = combine_values(
        Sources::named([("a", a), ("b", b)]),
        Sources::named([("c", c)]),
    )
    .unwrap();
    let (log, _sub) = record(&cb);

    ea.emit(1);
    assert_eq!(taken(&log), vec![named(&[("a", 1), ("b", 0)])]);
    ec.emit(5); // passive slot fills silently
    assert_eq!(log.borrow().len(), 1);
    eb.emit(2);
    assert_eq!(
        taken(&log),
        vec![
            named(&[("a", 1), ("b", 0)]),
            named(&[("a", 1), ("b", 2), ("c", 5)]),
        ]
    );
}

#[test]
fn named_ended_properties_replay_record_then_end() {
    let cb = combine_values::<i32, &'static str>(
        Sources::named([
            ("a", ended_property_with(1)),
            ("b", ended_property_with(2)),
        ]),
        Sources::named([("c", ended_property_with(3))]),
    )
    .unwrap();

    let (log, _sub) = record(&cb);
    assert_eq!(
        taken(&log),
        vec![named(&[("a", 1), ("b", 2), ("c", 3)]), Event::End]
    );

    // The combinator is a stream: nothing is retained for late subscribers.
    let (late, _sub2) = record(&cb);
    assert_eq!(taken(&late), vec![Event::End]);
}

#[test]
fn ended_stream_sources_end_without_value() {
    let cb = combine_values::<i32, &'static str>(
        Sources::list([ended_stream(), ended_stream()]),
        Sources::empty(),
    )
    .unwrap();
    let (log, _sub) = record(&cb);
    assert_eq!(taken(&log), vec![Event::End]);
}

#[test]
fn subscribing_activates_all_sources_and_unsubscribing_releases_them() {
    let (a, _ea) = stream::<i32, ()>();
    let (b, _eb) = stream::<i32, ()>();
    let (c, _ec) = stream::<i32, ()>();
    let cb =
        combine_values(Sources::list([a.clone(), b.clone()]), Sources::list([c.clone()])).unwrap();

    assert!(!a.is_active() && !b.is_active() && !c.is_active());
    let sub = cb.subscribe(|_| {});
    assert!(a.is_active() && b.is_active() && c.is_active());
    sub.unsubscribe();
    assert!(!a.is_active() && !b.is_active() && !c.is_active());
}

#[test]
fn errors_forward_in_arrival_order_and_leave_caches_intact() {
    // a: ---e---v---v-----
    // b: ----v---e----v---
    // c: -----v---e--v----
    let (a, ea) = stream::<i32, i32>();
    let (b, eb) = stream::<i32, i32>();
    let (c, ec) = stream::<i32, i32>();
    let cb = combine_values(Sources::list([a, b, c]), Sources::empty()).unwrap();
    let (log, _sub) = record(&cb);

    ea.error(-1);
    eb.emit(1);
    ec.emit(2);
    ea.emit(3);
    eb.error(-2);
    ec.error(-3);
    ea.emit(4);
    ec.emit(5);
    eb.emit(6);

    assert_eq!(
        taken(&log),
        vec![
            Event::Error(-1),
            Event::Value(Combined::List(vec![3, 1, 2])),
            Event::Error(-2),
            Event::Error(-3),
            // Errors never touch the cached values.
            Event::Value(Combined::List(vec![4, 1, 2])),
            Event::Value(Combined::List(vec![4, 1, 5])),
            Event::Value(Combined::List(vec![4, 6, 5])),
        ]
    );
}

#[test]
fn diamond_emits_one_atomic_update_per_root_value() {
    let (a, ea) = stream::<i32, &'static str>();
    let b = a.map(|x| x + 2);
    let c = a.map(|x| x * 2);
    let cb = combine_values(Sources::list([b]), Sources::list([c])).unwrap();
    let (log, _sub) = record(&cb);

    ea.emit(1);
    ea.emit(2);
    ea.emit(3);
    assert_eq!(taken(&log), vec![list(&[3, 2]), list(&[4, 4]), list(&[5, 6])]);
}

#[test]
fn stacked_combinators_stay_glitch_free() {
    // One root fans out into two combinators feeding a third; one event at
    // the root must collapse into exactly one event at the bottom.
    let (a, ea) = stream::<i32, &'static str>();
    let b = a.map(|x| x + 1);
    let c = a.map(|x| x * 10);
    let left = b.combine_with(&a, |x, y| x + y);
    let right = c.combine_with(&a, |x, y| x - y);
    let bottom = left.combine_with(&right, |l, r| l * 1000 + r);
    let (log, _sub) = record(&bottom);

    ea.emit(1); // left = 2+1, right = 10-1
    ea.emit(2); // left = 3+2, right = 20-2
    assert_eq!(taken(&log), vec![Event::Value(3009), Event::Value(5018)]);
}

#[test]
fn projection_runs_per_emission_not_per_source_event() {
    let (a, ea) = stream::<i32, ()>();
    let b = a.map(|x| x + 2);
    let c = a.map(|x| x * 2);
    let calls = std::rc::Rc::new(std::cell::Cell::new(0u32));
    let counter = std::rc::Rc::clone(&calls);
    let cb = combine(
        Sources::list([b, c]),
        Sources::empty(),
        move |combined: Combined<i32>| {
            counter.set(counter.get() + 1);
            combined
        },
    )
    .unwrap();
    let (_log, _sub) = record(&cb);

    ea.emit(1);
    ea.emit(2);
    assert_eq!(calls.get(), 2);
}

#[test]
fn reentrant_root_emission_runs_after_the_current_transaction() {
    // A subscriber feeding results back into another root: the fed-back
    // value is a fresh transaction, so downstream ordering stays coherent.
    let (a, ea) = stream::<i32, &'static str>();
    let (b, eb) = stream::<i32, &'static str>();
    let cb = combine_values(Sources::list([a.clone(), b]), Sources::empty()).unwrap();

    let feedback = ea.clone();
    let (log, _sub) = record(&cb);
    let _echo = a.subscribe(move |event| {
        if let Event::Value(v) = event {
            if v < 3 {
                feedback.emit(v + 1);
            }
        }
    });

    eb.emit(0);
    ea.emit(1);
    assert_eq!(taken(&log), vec![list(&[1, 0]), list(&[2, 0]), list(&[3, 0])]);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every root value through a diamond yields exactly one combined
        /// tuple, holding both projections of the same root value.
        #[test]
        fn diamond_is_glitch_free(values in proptest::collection::vec(-1000i32..1000, 0..64)) {
            let (a, ea) = stream::<i32, ()>();
            let b = a.map(|x| x + 2);
            let c = a.map(|x| x * 2);
            let cb = combine_values(Sources::list([b, c]), Sources::empty()).unwrap();
            let (log, _sub) = record(&cb);

            for v in &values {
                ea.emit(*v);
            }

            let expected: Vec<_> = values
                .iter()
                .map(|v| Event::Value(Combined::List(vec![v + 2, v * 2])))
                .collect();
            prop_assert_eq!(taken(&log), expected);
        }

        /// Interleaved values and errors over two sources: errors forward
        /// verbatim in order, values combine only once both slots hold one.
        #[test]
        fn errors_are_transparent(
            script in proptest::collection::vec(
                (0..2usize, prop_oneof![(0i32..100).prop_map(Ok), (0i32..100).prop_map(Err)]),
                0..48,
            )
        ) {
            let (a, ea) = stream::<i32, i32>();
            let (b, eb) = stream::<i32, i32>();
            let cb = combine_values(Sources::list([a, b]), Sources::empty()).unwrap();
            let (log, _sub) = record(&cb);

            let mut last = [None::<i32>, None::<i32>];
            let mut expected = Vec::new();
            for (index, action) in &script {
                let emitter = if *index == 0 { &ea } else { &eb };
                match action {
                    Ok(v) => {
                        emitter.emit(*v);
                        last[*index] = Some(*v);
                        if let [Some(x), Some(y)] = last {
                            expected.push(Event::Value(Combined::List(vec![x, y])));
                        }
                    }
                    Err(e) => {
                        emitter.error(*e);
                        expected.push(Event::Error(*e));
                    }
                }
            }
            prop_assert_eq!(taken(&log), expected);
        }
    }
}
