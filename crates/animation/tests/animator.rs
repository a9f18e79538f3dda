use animation::{
    Animatable, Animator, Easing, IterationCount, KeyframePoint, KeyframeRunSpec, PropertyWriter,
    TweenSpec, ValueSource,
};
use core::task::Poll;
use std::rc::Rc;

#[derive(Default)]
struct Sink {
    writes: Vec<(String, f64)>,
    completions: Vec<String>,
    ready: bool,
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn approx(left: f64, right: f64) -> bool {
    (left - right).abs() < 1e-9
}

fn values(sink: &Sink) -> Vec<f64> {
    sink.writes.iter().map(|(_, value)| *value).collect()
}

fn constant(value: f64) -> ValueSource<Sink, f64> {
    Rc::new(move |_sink: &mut Sink| Poll::Ready(Some(value)))
}

fn recording_writer() -> PropertyWriter<Sink, f64> {
    Rc::new(|sink: &mut Sink, name: &str, value: &f64| {
        sink.writes.push((name.to_owned(), *value));
    })
}

fn tween(from: f64, to: f64, duration_ms: f64, key: Option<&str>) -> TweenSpec<f64> {
    TweenSpec { from, to, duration_ms, easing: Easing::Linear, key: key.map(str::to_owned) }
}

fn record(label: &'static str) -> animation::UpdateFn<Sink, f64> {
    Box::new(move |sink: &mut Sink, value: &f64, _: f64| sink.writes.push((label.to_owned(), *value)))
}

fn complete(label: &'static str) -> Option<animation::CompleteFn<Sink, f64>> {
    Some(Box::new(move |sink: &mut Sink, _: &f64| sink.completions.push(label.to_owned())))
}

fn two_point_run(iterations: IterationCount) -> KeyframeRunSpec<Sink, f64> {
    KeyframeRunSpec {
        frames: vec![
            KeyframePoint { offset_ms: 100.0, values: vec![("x".into(), constant(10.0))] },
            KeyframePoint { offset_ms: 0.0, values: vec![("x".into(), constant(0.0))] },
        ],
        iterations,
        easing: Easing::Linear,
        writer: recording_writer(),
        key_prefix: "node-1:".into(),
        on_complete: Some(Box::new(|sink: &mut Sink| sink.completions.push("run".into()))),
    }
}

#[test]
fn tween_samples_then_lands_exactly_on_target() {
    init_logger();
    let mut sink = Sink::default();
    let mut animator: Animator<Sink, f64> = Animator::new();
    let id = animator.animate(&mut sink, tween(0.0, 10.0, 100.0, None), record("x"), complete("x"));
    assert!(id.is_some());
    assert!(sink.writes.is_empty(), "nothing is written before the first tick");

    animator.tick(&mut sink, 25.0);
    animator.tick(&mut sink, 50.0);
    animator.tick(&mut sink, 75.0);
    animator.tick(&mut sink, 130.0);
    animator.tick(&mut sink, 200.0);

    let seen = values(&sink);
    assert_eq!(seen.len(), 4);
    assert!(approx(seen[0], 0.0));
    assert!(approx(seen[1], 2.5));
    assert!(approx(seen[2], 5.0));
    assert_eq!(seen[3], 10.0);
    assert_eq!(sink.completions, vec!["x".to_owned()]);
    assert_eq!(animator.active_tweens(), 0);
}

#[test]
fn zero_and_invalid_durations_settle_synchronously() {
    let mut sink = Sink::default();
    let mut animator: Animator<Sink, f64> = Animator::new();
    for duration in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        let id = animator.animate(&mut sink, tween(1.0, 2.0, duration, None), record("x"), complete("x"));
        assert!(id.is_none());
    }
    assert_eq!(values(&sink), vec![2.0; 4]);
    assert_eq!(sink.completions.len(), 4);
    assert_eq!(animator.active_tweens(), 0);
}

#[derive(Clone, Debug, PartialEq)]
enum Sample {
    Num(f64),
    Word(String),
}

impl Animatable for Sample {
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Option<Self> {
        match (from, to) {
            (Self::Num(start), Self::Num(end)) => Some(Self::Num(start + (end - start) * progress)),
            _ => None,
        }
    }
}

#[test]
fn non_numeric_values_are_assigned_immediately() {
    let mut seen: Vec<(Sample, f64)> = Vec::new();
    let mut animator: Animator<Vec<(Sample, f64)>, Sample> = Animator::new();
    let id = animator.animate(
        &mut seen,
        TweenSpec {
            from: Sample::Num(1.0),
            to: Sample::Word("red".into()),
            duration_ms: 500.0,
            easing: Easing::Linear,
            key: None,
        },
        Box::new(|out: &mut Vec<(Sample, f64)>, value: &Sample, progress: f64| {
            out.push((value.clone(), progress));
        }),
        None,
    );
    assert!(id.is_none());
    assert_eq!(seen, vec![(Sample::Word("red".into()), 1.0)]);
}

#[test]
fn newer_tween_on_same_key_silences_older_one() {
    let mut sink = Sink::default();
    let mut animator: Animator<Sink, f64> = Animator::new();
    animator.animate(&mut sink, tween(0.0, 10.0, 100.0, Some("pos")), record("old"), complete("old"));
    animator.tick(&mut sink, 50.0);
    animator.animate(&mut sink, tween(5.0, 0.0, 100.0, Some("pos")), record("new"), complete("new"));
    assert!(animator.is_animating("pos"));

    animator.tick(&mut sink, 100.0);
    animator.tick(&mut sink, 150.0);
    animator.tick(&mut sink, 200.0);

    let labels: Vec<&str> = sink.writes.iter().map(|(label, _)| label.as_str()).collect();
    assert_eq!(labels, vec!["old", "new", "new", "new"]);
    assert_eq!(sink.completions, vec!["old".to_owned(), "new".to_owned()]);
    assert!(!animator.is_animating("pos"));
}

#[test]
fn keyframe_run_repeats_then_completes() {
    init_logger();
    let mut sink = Sink::default();
    let mut animator: Animator<Sink, f64> = Animator::new();
    let handle = animator.start_run(&mut sink, two_point_run(IterationCount::Count(2)));
    assert!(handle.is_active());
    assert_eq!(animator.active_runs(), 1);

    for now in [0.0, 50.0, 100.0, 150.0, 200.0] {
        animator.tick(&mut sink, now);
    }

    let seen = values(&sink);
    assert_eq!(seen.len(), 5);
    assert!(approx(seen[0], 0.0));
    assert!(approx(seen[1], 5.0));
    assert_eq!(seen[2], 10.0);
    assert!(approx(seen[3], 5.0));
    assert_eq!(seen[4], 10.0);
    assert!(sink.writes.iter().all(|(name, _)| name == "x"));
    assert_eq!(sink.completions, vec!["run".to_owned()]);
    assert!(!handle.is_active());
    assert_eq!(animator.active_runs(), 0);
    assert!(!animator.is_animating("node-1:x"));
}

#[test]
fn zero_iterations_complete_without_writing() {
    let mut sink = Sink::default();
    let mut animator: Animator<Sink, f64> = Animator::new();
    let handle = animator.start_run(&mut sink, two_point_run(IterationCount::Count(0)));
    assert!(!handle.is_active());
    assert!(sink.writes.is_empty());
    assert_eq!(sink.completions, vec!["run".to_owned()]);
}

#[test]
fn infinite_run_stops_only_when_cancelled() {
    let mut sink = Sink::default();
    let mut animator: Animator<Sink, f64> = Animator::new();
    let handle = animator.start_run(&mut sink, two_point_run(IterationCount::Infinite));
    for step in 1..=10 {
        animator.tick(&mut sink, f64::from(step) * 50.0);
    }
    assert!(handle.is_active());
    assert_eq!(sink.writes.len(), 10);

    handle.cancel();
    animator.tick(&mut sink, 550.0);
    assert_eq!(sink.writes.len(), 10, "cancelled tweens stop writing");
    assert_eq!(animator.active_runs(), 0);
    assert_eq!(animator.active_tweens(), 0);
    assert!(sink.completions.is_empty());
}

#[test]
fn pending_source_holds_the_segment() {
    let mut sink = Sink::default();
    let mut animator: Animator<Sink, f64> = Animator::new();
    let late: ValueSource<Sink, f64> = Rc::new(|sink: &mut Sink| {
        if sink.ready { Poll::Ready(Some(10.0)) } else { Poll::Pending }
    });
    let mut spec = two_point_run(IterationCount::Count(1));
    spec.frames[0].values = vec![("x".into(), late)];

    animator.start_run(&mut sink, spec);
    assert_eq!(animator.active_tweens(), 0);
    animator.tick(&mut sink, 50.0);
    assert_eq!(animator.active_tweens(), 0);

    sink.ready = true;
    animator.tick(&mut sink, 60.0);
    assert_eq!(animator.active_tweens(), 1);
    animator.tick(&mut sink, 110.0);
    animator.tick(&mut sink, 160.0);
    let seen = values(&sink);
    assert!(approx(seen[0], 5.0));
    assert_eq!(seen[1], 10.0);
    assert_eq!(sink.completions, vec!["run".to_owned()]);
}

#[test]
fn unresolved_and_unshared_properties_are_skipped() {
    let mut sink = Sink::default();
    let mut animator: Animator<Sink, f64> = Animator::new();
    let never: ValueSource<Sink, f64> = Rc::new(|_sink: &mut Sink| Poll::Ready(None));
    let spec = KeyframeRunSpec {
        frames: vec![
            KeyframePoint {
                offset_ms: 0.0,
                values: vec![
                    ("x".into(), constant(0.0)),
                    ("y".into(), never),
                    ("only-start".into(), constant(1.0)),
                ],
            },
            KeyframePoint {
                offset_ms: 100.0,
                values: vec![("x".into(), constant(4.0)), ("y".into(), constant(4.0))],
            },
        ],
        iterations: IterationCount::Count(1),
        easing: Easing::Linear,
        writer: recording_writer(),
        key_prefix: String::new(),
        on_complete: None,
    };
    animator.start_run(&mut sink, spec);
    assert_eq!(animator.active_tweens(), 1);
    animator.tick(&mut sink, 0.0);
    animator.tick(&mut sink, 100.0);
    assert_eq!(sink.writes, vec![("x".to_owned(), 0.0), ("x".to_owned(), 4.0)]);
    assert_eq!(animator.active_runs(), 0);
}

#[test]
fn late_clock_start_still_runs_the_full_duration() {
    let mut sink = Sink::default();
    let mut animator: Animator<Sink, f64> = Animator::new();
    animator.animate(&mut sink, tween(0.0, 10.0, 1000.0, Some("t")), record("t"), complete("t"));
    animator.start_run(&mut sink, two_point_run(IterationCount::Count(1)));

    animator.tick(&mut sink, 5000.0);
    animator.tick(&mut sink, 5050.0);
    assert!(sink.completions.is_empty());
    assert!(sink.writes.iter().any(|(name, value)| name == "x" && approx(*value, 5.0)));
    assert!(sink.writes.iter().any(|(name, value)| name == "t" && approx(*value, 0.5)));

    animator.tick(&mut sink, 5100.0);
    assert_eq!(sink.completions, vec!["run".to_owned()]);
    animator.tick(&mut sink, 6000.0);
    assert_eq!(sink.completions, vec!["run".to_owned(), "t".to_owned()]);
    assert_eq!(sink.writes.last(), Some(&("t".to_owned(), 10.0)));
}
