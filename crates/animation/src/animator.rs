use crate::easing::Easing;
use crate::interpolate::Animatable;
use crate::keyframes::{IterationCount, KeyframeRunSpec, RunHandle};
use core::cell::Cell;
use core::mem;
use core::task::Poll;
use log::debug;
use std::rc::Rc;

/// Called with the interpolated value and eased progress on every sample.
pub type UpdateFn<C, V> = Box<dyn FnMut(&mut C, &V, f64)>;
/// Called once with the final value.
pub type CompleteFn<C, V> = Box<dyn FnOnce(&mut C, &V)>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TweenId(u64);

/// One `from -> to` interpolation request.
#[derive(Debug, Clone)]
pub struct TweenSpec<V> {
    pub from: V,
    pub to: V,
    pub duration_ms: f64,
    pub easing: Easing,
    /// Target identity. A newer tween with the same key silences this one.
    pub key: Option<String>,
}

struct Tween<C, V> {
    /// Anchored by the first tick that sees the tween.
    start_ms: Option<f64>,
    spec: TweenSpec<V>,
    /// Still runs to completion, but no longer writes samples.
    superseded: bool,
    owner: Option<u64>,
    on_update: UpdateFn<C, V>,
    on_complete: Option<CompleteFn<C, V>>,
}

enum Phase {
    /// About to start the segment between frames `n` and `n + 1`.
    Start(usize),
    Running {
        pair: usize,
        outstanding: Rc<Cell<usize>>,
    },
}

struct KeyframeRun<C, V> {
    id: u64,
    spec: KeyframeRunSpec<C, V>,
    handle: RunHandle,
    iteration: u32,
    phase: Phase,
}

enum SegmentStart {
    Pending,
    Started(Rc<Cell<usize>>),
}

/// Tick-driven interpolation engine over a context `C` and value type `V`.
pub struct Animator<C, V> {
    now_ms: f64,
    /// Set while [`Animator::tick`] runs; segments chained there start at `now_ms`.
    ticking: bool,
    next_id: u64,
    tweens: Vec<Tween<C, V>>,
    runs: Vec<KeyframeRun<C, V>>,
}

impl<C, V> Default for Animator<C, V> {
    fn default() -> Self {
        Self {
            now_ms: 0.0,
            ticking: false,
            next_id: 1,
            tweens: Vec::new(),
            runs: Vec::new(),
        }
    }
}

impl<C: 'static, V: Animatable + 'static> Animator<C, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of the latest tick.
    pub const fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn active_tweens(&self) -> usize {
        self.tweens.len()
    }

    pub fn active_runs(&self) -> usize {
        self.runs.len()
    }

    /// True while a live, non-superseded tween targets `key`.
    pub fn is_animating(&self, key: &str) -> bool {
        self.tweens
            .iter()
            .any(|tween| !tween.superseded && tween.spec.key.as_deref() == Some(key))
    }

    /// Drop every tween and run without invoking callbacks.
    pub fn clear(&mut self) {
        for run in &self.runs {
            run.handle.cancel();
        }
        self.tweens.clear();
        self.runs.clear();
    }

    fn mint(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Silence every tween targeting `key`. They still complete on schedule.
    pub fn supersede(&mut self, key: &str) {
        for tween in &mut self.tweens {
            if tween.spec.key.as_deref() == Some(key) {
                tween.superseded = true;
            }
        }
    }

    /// Animate `spec.from -> spec.to`.
    ///
    /// Non-numeric pairs and non-positive or non-finite durations settle
    /// synchronously: `on_update(to, 1.0)` then `on_complete(to)`, and `None` is
    /// returned. Otherwise the tween is sampled on every [`Animator::tick`],
    /// starting from the first tick after the call.
    pub fn animate(
        &mut self,
        ctx: &mut C,
        spec: TweenSpec<V>,
        on_update: UpdateFn<C, V>,
        on_complete: Option<CompleteFn<C, V>>,
    ) -> Option<TweenId> {
        self.start_tween(ctx, spec, on_update, on_complete, None)
    }

    fn start_tween(
        &mut self,
        ctx: &mut C,
        spec: TweenSpec<V>,
        mut on_update: UpdateFn<C, V>,
        on_complete: Option<CompleteFn<C, V>>,
        owner: Option<u64>,
    ) -> Option<TweenId> {
        if let Some(key) = spec.key.as_deref() {
            self.supersede(key);
        }
        let numeric = V::interpolate(&spec.from, &spec.to, 0.0).is_some();
        let timed = spec.duration_ms.is_finite() && spec.duration_ms > 0.0;
        if !numeric || !timed {
            on_update(ctx, &spec.to, 1.0);
            if let Some(done) = on_complete {
                done(ctx, &spec.to);
            }
            return None;
        }
        let id = self.mint();
        self.tweens.push(Tween {
            start_ms: self.ticking.then_some(self.now_ms),
            spec,
            superseded: false,
            owner,
            on_update,
            on_complete,
        });
        Some(TweenId(id))
    }

    /// Start a keyframe run. The first segment begins immediately.
    pub fn start_run(&mut self, ctx: &mut C, mut spec: KeyframeRunSpec<C, V>) -> RunHandle {
        spec.frames
            .sort_by(|left, right| left.offset_ms.total_cmp(&right.offset_ms));
        let handle = RunHandle::new();
        if spec.iterations == IterationCount::Count(0) {
            handle.finish();
            if let Some(done) = spec.on_complete.take() {
                done(ctx);
            }
            return handle;
        }
        let mut run = KeyframeRun {
            id: self.mint(),
            spec,
            handle: handle.clone(),
            iteration: 0,
            phase: Phase::Start(0),
        };
        if self.step_run(ctx, &mut run) {
            self.runs.push(run);
        }
        handle
    }

    /// Advance every tween and run to `now_ms`.
    pub fn tick(&mut self, ctx: &mut C, now_ms: f64) {
        self.now_ms = now_ms;
        self.ticking = true;
        self.drop_cancelled_runs();
        self.advance_tweens(ctx);
        let runs = mem::take(&mut self.runs);
        let mut live = Vec::with_capacity(runs.len());
        for mut run in runs {
            if self.step_run(ctx, &mut run) {
                live.push(run);
            }
        }
        live.append(&mut self.runs);
        self.runs = live;
        self.ticking = false;
    }

    fn drop_cancelled_runs(&mut self) {
        let cancelled: Vec<u64> = self
            .runs
            .iter()
            .filter(|run| !run.handle.is_active())
            .map(|run| run.id)
            .collect();
        if cancelled.is_empty() {
            return;
        }
        self.runs.retain(|run| !cancelled.contains(&run.id));
        self.tweens
            .retain(|tween| tween.owner.is_none_or(|owner| !cancelled.contains(&owner)));
    }

    fn advance_tweens(&mut self, ctx: &mut C) {
        let now = self.now_ms;
        let tweens = mem::take(&mut self.tweens);
        let mut live = Vec::with_capacity(tweens.len());
        for mut tween in tweens {
            let start = *tween.start_ms.get_or_insert(now);
            let elapsed = (now - start).max(0.0);
            if elapsed >= tween.spec.duration_ms {
                if !tween.superseded {
                    (tween.on_update)(ctx, &tween.spec.to, 1.0);
                }
                if let Some(done) = tween.on_complete.take() {
                    done(ctx, &tween.spec.to);
                }
                continue;
            }
            if !tween.superseded {
                let eased = tween.spec.easing.ease(elapsed / tween.spec.duration_ms);
                if let Some(value) = V::interpolate(&tween.spec.from, &tween.spec.to, eased) {
                    (tween.on_update)(ctx, &value, eased);
                }
            }
            live.push(tween);
        }
        live.append(&mut self.tweens);
        self.tweens = live;
    }

    /// Drive a run as far as it can go this tick. Returns false once it finished.
    fn step_run(&mut self, ctx: &mut C, run: &mut KeyframeRun<C, V>) -> bool {
        let mut wrapped = false;
        loop {
            match &run.phase {
                Phase::Running { pair, outstanding } => {
                    if outstanding.get() > 0 {
                        return true;
                    }
                    run.phase = Phase::Start(pair + 1);
                }
                Phase::Start(pair) => {
                    let pair = *pair;
                    if pair + 1 >= run.spec.frames.len() {
                        run.iteration = run.iteration.saturating_add(1);
                        let finished = match run.spec.iterations {
                            IterationCount::Count(count) => run.iteration >= count,
                            IterationCount::Infinite => false,
                        };
                        if finished {
                            run.handle.finish();
                            if let Some(done) = run.spec.on_complete.take() {
                                done(ctx);
                            }
                            return false;
                        }
                        run.phase = Phase::Start(0);
                        // At most one repeat per tick, so zero-length sequences cannot spin.
                        if wrapped {
                            return true;
                        }
                        wrapped = true;
                        continue;
                    }
                    match self.start_segment(ctx, run, pair) {
                        SegmentStart::Pending => return true,
                        SegmentStart::Started(outstanding) => {
                            run.phase = Phase::Running { pair, outstanding };
                        }
                    }
                }
            }
        }
    }

    fn start_segment(&mut self, ctx: &mut C, run: &KeyframeRun<C, V>, pair: usize) -> SegmentStart {
        let (Some(from), Some(to)) = (run.spec.frames.get(pair), run.spec.frames.get(pair + 1))
        else {
            return SegmentStart::Started(Rc::new(Cell::new(0)));
        };
        let mut resolved: Vec<(String, V, V)> = Vec::new();
        for (name, from_source) in &from.values {
            if resolved.iter().any(|(seen, _, _)| seen == name) {
                continue;
            }
            let Some(to_source) = to.source(name) else {
                continue;
            };
            match (from_source(ctx), to_source(ctx)) {
                (Poll::Ready(Some(start)), Poll::Ready(Some(end))) => {
                    resolved.push((name.clone(), start, end));
                }
                (Poll::Pending, _) | (_, Poll::Pending) => return SegmentStart::Pending,
                _ => debug!("Keyframe value for `{name}` did not resolve; segment skips it"),
            }
        }
        let duration_ms = to.offset_ms - from.offset_ms;
        let outstanding = Rc::new(Cell::new(resolved.len()));
        for (name, start, end) in resolved {
            let writer = Rc::clone(&run.spec.writer);
            let counter = Rc::clone(&outstanding);
            let key = format!("{}{name}", run.spec.key_prefix);
            self.start_tween(
                ctx,
                TweenSpec {
                    from: start,
                    to: end,
                    duration_ms,
                    easing: run.spec.easing,
                    key: Some(key),
                },
                Box::new(move |ctx: &mut C, value: &V, _: f64| writer(ctx, &name, value)),
                Some(Box::new(move |_: &mut C, _: &V| {
                    counter.set(counter.get().saturating_sub(1));
                })),
                Some(run.id),
            );
        }
        SegmentStart::Started(outstanding)
    }
}
