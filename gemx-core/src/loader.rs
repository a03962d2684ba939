//! Scroll driver for virtualized conversations.
//!
//! The loader walks the conversation through an explicit state machine:
//!
//! ```text
//! Initializing -> Settling -> Advancing <-> Stabilizing
//!                                 |              |
//!                                 +--> Terminal <+
//! ```
//!
//! Every wait goes through the injected [`Clock`] and every loop has a cap,
//! so a run always terminates. Hosts that need cancellation drive
//! [`Loader::step`] themselves and stop between steps.

use std::env;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::error::{GemxError, Result};
use crate::fingerprint::Accumulator;
use crate::locate::extract_batch;
use crate::model::{Direction, Message};
use crate::view::{ChatView, Rect, ScrollMetrics, ScrollRegion, ScrollTarget};

const CONTAINER_PATTERNS: &[&str] = &[
    "chat-history",
    "conversation-container",
    "infinite-scroller",
    "chat-container",
    "scroll-container",
];
const SIDEBAR_MAX_LEFT: f64 = 50.0;
const SIDEBAR_MAX_WIDTH: f64 = 400.0;
const UNCHANGED_EPSILON: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    pub direction: Direction,
    /// Share of the visible height moved per advance.
    pub advance_fraction: f64,
    pub initial_settle: Duration,
    pub poll_interval: Duration,
    pub max_stabilize_polls: usize,
    /// Distance from the origin that counts as arrived.
    pub origin_threshold: f64,
    /// Consecutive advances without movement before giving up.
    pub stuck_limit: usize,
    pub max_steps: usize,
    pub final_passes: usize,
    pub final_delay: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TowardOrigin,
            advance_fraction: 0.8,
            initial_settle: Duration::from_millis(1500),
            poll_interval: Duration::from_millis(50),
            max_stabilize_polls: 20,
            origin_threshold: 5.0,
            stuck_limit: 3,
            max_steps: 500,
            final_passes: 3,
            final_delay: Duration::from_millis(400),
        }
    }
}

impl LoaderConfig {
    /// Same bounds as the default with every wait removed, for views that
    /// are already fully materialized.
    pub fn immediate() -> Self {
        Self {
            initial_settle: Duration::ZERO,
            poll_interval: Duration::ZERO,
            final_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Precedence: `GEMX_*` environment variables, then the values already
    /// set. Unparseable values are ignored.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(steps) = override_number(&lookup, "GEMX_MAX_STEPS") {
            self.max_steps = usize::try_from(steps).unwrap_or(self.max_steps);
        }
        if let Some(ms) = override_number(&lookup, "GEMX_SETTLE_MS") {
            self.initial_settle = Duration::from_millis(ms);
        }
        if let Some(ms) = override_number(&lookup, "GEMX_POLL_MS") {
            self.poll_interval = Duration::from_millis(ms);
        }
        match override_number(&lookup, "GEMX_STUCK_LIMIT") {
            // zero would end every traversal after the first advance
            Some(0) => warn!("ignoring GEMX_STUCK_LIMIT=0, the limit must be at least 1"),
            Some(limit) => {
                self.stuck_limit = usize::try_from(limit).unwrap_or(self.stuck_limit);
            }
            None => {}
        }
        self
    }
}

fn override_number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, value = %raw, %err, "ignoring invalid loader override");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    ReachedOrigin,
    Stuck,
    StepCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Initializing,
    Settling,
    Advancing,
    Stabilizing,
    Terminal(TerminalReason),
}

/// Outcome of a full traversal. `messages` already had the final dedupe pass.
#[derive(Debug, Clone)]
pub struct Traversal {
    pub messages: Vec<Message>,
    pub reason: TerminalReason,
    pub target: ScrollTarget,
    pub steps: usize,
    pub polls: usize,
}

pub struct Loader<'a> {
    view: &'a mut dyn ChatView,
    clock: &'a mut dyn Clock,
    config: LoaderConfig,
    accumulator: Accumulator,
    state: LoaderState,
    target: ScrollTarget,
    steps: usize,
    polls: usize,
    stuck_count: usize,
    top_before_advance: Option<f64>,
}

impl<'a> Loader<'a> {
    pub fn new(view: &'a mut dyn ChatView, clock: &'a mut dyn Clock, config: LoaderConfig) -> Self {
        Self {
            view,
            clock,
            config,
            accumulator: Accumulator::new(),
            state: LoaderState::Initializing,
            target: ScrollTarget::Viewport,
            steps: 0,
            polls: 0,
            stuck_count: 0,
            top_before_advance: None,
        }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn collected(&self) -> usize {
        self.accumulator.len()
    }

    /// Runs one transition and returns the new state.
    pub fn step(&mut self) -> Result<LoaderState> {
        let next = match self.state {
            LoaderState::Initializing => self.initialize()?,
            LoaderState::Settling => self.settle(),
            LoaderState::Advancing => self.advance()?,
            LoaderState::Stabilizing => self.stabilize(),
            LoaderState::Terminal(reason) => LoaderState::Terminal(reason),
        };
        debug!(from = ?self.state, to = ?next, collected = self.accumulator.len(), "loader transition");
        self.state = next;
        Ok(next)
    }

    #[instrument(skip_all, fields(direction = ?self.config.direction))]
    pub fn run(mut self) -> Result<Traversal> {
        let reason = loop {
            if let LoaderState::Terminal(reason) = self.step()? {
                break reason;
            }
        };

        info!(
            ?reason,
            steps = self.steps,
            polls = self.polls,
            collected = self.accumulator.len(),
            target = %self.target,
            "traversal finished"
        );

        Ok(Traversal {
            messages: self.accumulator.into_messages(),
            reason,
            target: self.target,
            steps: self.steps,
            polls: self.polls,
        })
    }

    fn initialize(&mut self) -> Result<LoaderState> {
        let regions = self.view.scroll_regions().unwrap_or_else(|err| {
            warn!(%err, "scroll regions unavailable, falling back to the viewport");
            Vec::new()
        });
        self.target = resolve_scroll_target(&regions);

        let metrics = self
            .view
            .metrics(&self.target)
            .map_err(|source| GemxError::extraction("measuring the scroll region", source))?;
        let start = match self.config.direction {
            Direction::TowardOrigin => metrics.max_top(),
            Direction::TowardEnd => 0.0,
        };
        self.view
            .scroll_to(&self.target, start)
            .map_err(|source| GemxError::extraction("jumping to the conversation end", source))?;

        debug!(target = %self.target, start, "scroll target resolved");
        Ok(LoaderState::Settling)
    }

    fn settle(&mut self) -> LoaderState {
        self.clock.sleep(self.config.initial_settle);
        self.extract_and_merge();
        LoaderState::Advancing
    }

    fn advance(&mut self) -> Result<LoaderState> {
        let metrics = self
            .view
            .metrics(&self.target)
            .map_err(|source| GemxError::extraction("reading the scroll position", source))?;

        if self.at_origin(&metrics) {
            self.final_passes();
            return Ok(LoaderState::Terminal(TerminalReason::ReachedOrigin));
        }
        if self.steps >= self.config.max_steps {
            warn!(steps = self.steps, "step cap reached before the origin");
            return Ok(LoaderState::Terminal(TerminalReason::StepCap));
        }

        let next = self.next_position(&metrics);
        self.view
            .scroll_to(&self.target, next)
            .map_err(|source| GemxError::extraction("scrolling the conversation", source))?;
        self.top_before_advance = Some(metrics.scroll_top);
        self.steps += 1;
        Ok(LoaderState::Stabilizing)
    }

    fn stabilize(&mut self) -> LoaderState {
        let mut previous: Option<(f64, usize)> = None;
        for _ in 0..self.config.max_stabilize_polls {
            self.clock.sleep(self.config.poll_interval);
            self.polls += 1;

            let height = match self.view.metrics(&self.target) {
                Ok(metrics) => metrics.scroll_height,
                Err(err) => {
                    debug!(%err, "poll failed, retrying");
                    continue;
                }
            };
            self.extract_and_merge();

            let observed = (height, self.accumulator.len());
            if previous == Some(observed) {
                break;
            }
            previous = Some(observed);
        }

        let top_after = self.view.metrics(&self.target).ok().map(|m| m.scroll_top);
        match (self.top_before_advance, top_after) {
            (Some(before), Some(after)) if (after - before).abs() < UNCHANGED_EPSILON => {
                self.stuck_count += 1;
            }
            _ => self.stuck_count = 0,
        }

        if self.stuck_count >= self.config.stuck_limit {
            warn!(
                stuck = self.stuck_count,
                steps = self.steps,
                "scroll position stopped moving"
            );
            return LoaderState::Terminal(TerminalReason::Stuck);
        }
        LoaderState::Advancing
    }

    fn final_passes(&mut self) {
        for pass in 0..self.config.final_passes {
            self.clock.sleep(self.config.final_delay);
            let added = self.extract_and_merge();
            debug!(pass, added, "final pass at origin");
        }
    }

    fn extract_and_merge(&mut self) -> usize {
        let html = match self.view.current_html() {
            Ok(html) => html,
            Err(err) => {
                debug!(%err, "snapshot unavailable, retrying on next pass");
                return 0;
            }
        };

        let offset = *self.clock.now().offset();
        let batch = extract_batch(&html, &offset);
        let found = batch.len();
        let added = self.accumulator.merge(batch, self.config.direction);
        debug!(found, added, total = self.accumulator.len(), "batch merged");
        added
    }

    fn at_origin(&self, metrics: &ScrollMetrics) -> bool {
        match self.config.direction {
            Direction::TowardOrigin => metrics.scroll_top <= self.config.origin_threshold,
            Direction::TowardEnd => {
                metrics.scroll_top >= metrics.max_top() - self.config.origin_threshold
            }
        }
    }

    fn next_position(&self, metrics: &ScrollMetrics) -> f64 {
        let delta = metrics.client_height * self.config.advance_fraction;
        match self.config.direction {
            Direction::TowardOrigin => (metrics.scroll_top - delta).max(0.0),
            Direction::TowardEnd => (metrics.scroll_top + delta).min(metrics.max_top()),
        }
    }
}

/// Chooses where to scroll: the closest scrollable ancestor of a message,
/// then a known chat container, then the largest scrollable region outside
/// the sidebar, then the viewport.
pub fn resolve_scroll_target(regions: &[ScrollRegion]) -> ScrollTarget {
    let scrollable = || regions.iter().filter(|region| region.metrics.is_scrollable());

    if let Some(region) = scrollable()
        .filter_map(|region| region.message_depth.map(|depth| (depth, region)))
        .min_by_key(|(depth, _)| *depth)
        .map(|(_, region)| region)
    {
        return region.target();
    }

    if let Some(region) = scrollable().find(|region| {
        let class_name = region.class_name.to_ascii_lowercase();
        CONTAINER_PATTERNS
            .iter()
            .any(|pattern| class_name.contains(pattern))
    }) {
        return region.target();
    }

    scrollable()
        .filter(|region| !is_sidebar(&region.rect))
        .max_by(|a, b| a.rect.area().total_cmp(&b.rect.area()))
        .map_or(ScrollTarget::Viewport, ScrollRegion::target)
}

fn is_sidebar(rect: &Rect) -> bool {
    rect.left < SIDEBAR_MAX_LEFT && rect.width <= SIDEBAR_MAX_WIDTH
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::DateTime;

    use super::{Loader, LoaderConfig, LoaderState, TerminalReason, resolve_scroll_target};
    use crate::clock::ManualClock;
    use crate::error::{GemxError, ViewError};
    use crate::model::Direction;
    use crate::view::{
        ChatView, Rect, ReplayView, ScrollMetrics, ScrollRegion, ScrollTarget,
    };

    fn clock() -> ManualClock {
        ManualClock::new(DateTime::parse_from_rfc3339("2026-01-08T12:00:00Z").expect("parse"))
    }

    fn turn(i: usize) -> String {
        format!(
            r#"<user-query><div class="query-text"><p>question {i}</p></div></user-query>
            <model-response><div class="markdown"><p>answer {i}</p></div></model-response>"#
        )
    }

    /// Window `i` shows turn `i` plus the tail of turn `i - 1`.
    fn windows(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                let overlap = if i > 0 {
                    format!(
                        r#"<model-response><div class="markdown"><p>answer {}</p></div></model-response>"#,
                        i - 1
                    )
                } else {
                    String::new()
                };
                format!("<main>{overlap}{}</main>", turn(i))
            })
            .collect()
    }

    fn expected_contents(count: usize) -> Vec<String> {
        (0..count)
            .flat_map(|i| [format!("question {i}"), format!("answer {i}")])
            .collect()
    }

    struct StuckView;

    impl ChatView for StuckView {
        fn current_html(&mut self) -> Result<String, ViewError> {
            Ok(turn(7))
        }

        fn scroll_regions(&mut self) -> Result<Vec<ScrollRegion>, ViewError> {
            Ok(Vec::new())
        }

        fn metrics(&mut self, _target: &ScrollTarget) -> Result<ScrollMetrics, ViewError> {
            Ok(ScrollMetrics {
                scroll_top: 5000.0,
                scroll_height: 10_000.0,
                client_height: 1000.0,
            })
        }

        fn scroll_to(&mut self, _target: &ScrollTarget, _top: f64) -> Result<(), ViewError> {
            Ok(())
        }
    }

    /// Moves freely but never runs out of content.
    struct EndlessView {
        top: f64,
    }

    impl ChatView for EndlessView {
        fn current_html(&mut self) -> Result<String, ViewError> {
            Ok(turn(1))
        }

        fn scroll_regions(&mut self) -> Result<Vec<ScrollRegion>, ViewError> {
            Ok(Vec::new())
        }

        fn metrics(&mut self, _target: &ScrollTarget) -> Result<ScrollMetrics, ViewError> {
            Ok(ScrollMetrics {
                scroll_top: self.top,
                scroll_height: 1e12,
                client_height: 1000.0,
            })
        }

        fn scroll_to(&mut self, _target: &ScrollTarget, top: f64) -> Result<(), ViewError> {
            self.top = top;
            Ok(())
        }
    }

    /// Fails every other snapshot request.
    struct FlakyView {
        inner: ReplayView,
        calls: usize,
    }

    impl ChatView for FlakyView {
        fn current_html(&mut self) -> Result<String, ViewError> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(ViewError::Query("transient".to_string()));
            }
            self.inner.current_html()
        }

        fn scroll_regions(&mut self) -> Result<Vec<ScrollRegion>, ViewError> {
            self.inner.scroll_regions()
        }

        fn metrics(&mut self, target: &ScrollTarget) -> Result<ScrollMetrics, ViewError> {
            self.inner.metrics(target)
        }

        fn scroll_to(&mut self, target: &ScrollTarget, top: f64) -> Result<(), ViewError> {
            self.inner.scroll_to(target, top)
        }
    }

    /// Releases one older turn and grows the scroll extent on each of the
    /// first three measurements after the first upward scroll.
    struct GrowingView {
        top: f64,
        height: f64,
        released: usize,
        growth_left: usize,
        grown: bool,
    }

    impl ChatView for GrowingView {
        fn current_html(&mut self) -> Result<String, ViewError> {
            let turns = (4 - self.released..4).map(turn).collect::<String>();
            Ok(format!("<main>{turns}</main>"))
        }

        fn scroll_regions(&mut self) -> Result<Vec<ScrollRegion>, ViewError> {
            Ok(Vec::new())
        }

        fn metrics(&mut self, _target: &ScrollTarget) -> Result<ScrollMetrics, ViewError> {
            if self.growth_left > 0 {
                self.growth_left -= 1;
                self.height += 500.0;
                self.released += 1;
            }
            Ok(ScrollMetrics {
                scroll_top: self.top,
                scroll_height: self.height,
                client_height: 1000.0,
            })
        }

        fn scroll_to(&mut self, _target: &ScrollTarget, top: f64) -> Result<(), ViewError> {
            if top < self.top && !self.grown {
                self.grown = true;
                self.growth_left = 3;
            }
            self.top = top.clamp(0.0, self.height - 1000.0);
            Ok(())
        }
    }

    struct DetachedView;

    impl ChatView for DetachedView {
        fn current_html(&mut self) -> Result<String, ViewError> {
            Err(ViewError::Detached("closed".to_string()))
        }

        fn scroll_regions(&mut self) -> Result<Vec<ScrollRegion>, ViewError> {
            Err(ViewError::Detached("closed".to_string()))
        }

        fn metrics(&mut self, _target: &ScrollTarget) -> Result<ScrollMetrics, ViewError> {
            Err(ViewError::Detached("closed".to_string()))
        }

        fn scroll_to(&mut self, _target: &ScrollTarget, _top: f64) -> Result<(), ViewError> {
            Err(ViewError::Detached("closed".to_string()))
        }
    }

    #[test]
    fn replay_toward_origin_collects_in_chronological_order() {
        let mut view = ReplayView::new(windows(5), 100.0);
        let mut clock = clock();

        let traversal = Loader::new(&mut view, &mut clock, LoaderConfig::default())
            .run()
            .expect("traversal");

        assert_eq!(traversal.reason, TerminalReason::ReachedOrigin);
        assert_eq!(traversal.steps, 5);
        let contents = traversal
            .messages
            .iter()
            .map(|m| m.content.clone())
            .collect::<Vec<_>>();
        assert_eq!(contents, expected_contents(5));
    }

    #[test]
    fn replay_toward_end_collects_in_chronological_order() {
        let mut view = ReplayView::new(windows(4), 100.0);
        let mut clock = clock();
        let config = LoaderConfig::default().with_direction(Direction::TowardEnd);

        let traversal = Loader::new(&mut view, &mut clock, config)
            .run()
            .expect("traversal");

        assert_eq!(traversal.reason, TerminalReason::ReachedOrigin);
        let contents = traversal
            .messages
            .iter()
            .map(|m| m.content.clone())
            .collect::<Vec<_>>();
        assert_eq!(contents, expected_contents(4));
    }

    #[test]
    fn stuck_view_stops_at_stuck_limit() {
        let mut view = StuckView;
        let mut clock = clock();
        let config = LoaderConfig::default();

        let traversal = Loader::new(&mut view, &mut clock, config.clone())
            .run()
            .expect("traversal");

        assert_eq!(traversal.reason, TerminalReason::Stuck);
        assert_eq!(traversal.steps, config.stuck_limit);
        assert!(traversal.steps < config.max_steps);
        assert_eq!(traversal.messages.len(), 2);
    }

    #[test]
    fn endless_view_stops_at_step_cap() {
        let mut view = EndlessView { top: 0.0 };
        let mut clock = clock();
        let config = LoaderConfig {
            max_steps: 12,
            ..LoaderConfig::immediate()
        };

        let traversal = Loader::new(&mut view, &mut clock, config)
            .run()
            .expect("traversal");

        assert_eq!(traversal.reason, TerminalReason::StepCap);
        assert_eq!(traversal.steps, 12);
    }

    #[test]
    fn stable_views_stop_polling_early() {
        let mut view = ReplayView::new(windows(3), 100.0);
        let mut clock = clock();
        let config = LoaderConfig::default();

        let traversal = Loader::new(&mut view, &mut clock, config.clone())
            .run()
            .expect("traversal");

        assert!(traversal.polls < traversal.steps * config.max_stabilize_polls);
        let final_sleeps = &clock.sleeps()[clock.sleeps().len() - config.final_passes..];
        assert!(final_sleeps.iter().all(|d| *d == config.final_delay));
        assert_eq!(clock.sleeps()[0], config.initial_settle);
    }

    #[test]
    fn growing_view_is_polled_until_height_and_count_settle() {
        let mut view = GrowingView {
            top: 1000.0,
            height: 2000.0,
            released: 1,
            growth_left: 0,
            grown: false,
        };
        let mut clock = clock();

        let traversal = Loader::new(&mut view, &mut clock, LoaderConfig::immediate())
            .run()
            .expect("traversal");

        assert_eq!(traversal.reason, TerminalReason::ReachedOrigin);
        assert_eq!(traversal.steps, 2);
        // three growing polls plus one confirming poll, then two for the
        // already stable second advance
        assert_eq!(traversal.polls, 6);
        assert_eq!(view.height, 3500.0);
        let contents = traversal
            .messages
            .iter()
            .map(|m| m.content.clone())
            .collect::<Vec<_>>();
        assert_eq!(contents, expected_contents(4));
    }

    #[test]
    fn env_overrides_reject_zero_stuck_limit() {
        let lookup = |key: &str| match key {
            "GEMX_STUCK_LIMIT" => Some("0".to_string()),
            "GEMX_MAX_STEPS" => Some(" 40 ".to_string()),
            "GEMX_POLL_MS" => Some("fast".to_string()),
            _ => None,
        };

        let config = LoaderConfig::default().with_overrides(lookup);
        assert_eq!(config.stuck_limit, LoaderConfig::default().stuck_limit);
        assert_eq!(config.max_steps, 40);
        assert_eq!(config.poll_interval, LoaderConfig::default().poll_interval);

        let config = LoaderConfig::default()
            .with_overrides(|key| (key == "GEMX_STUCK_LIMIT").then(|| "1".to_string()));
        assert_eq!(config.stuck_limit, 1);
    }

    #[test]
    fn transient_snapshot_failures_are_tolerated() {
        let mut view = FlakyView {
            inner: ReplayView::new(windows(4), 100.0),
            calls: 0,
        };
        let mut clock = clock();

        let traversal = Loader::new(&mut view, &mut clock, LoaderConfig::immediate())
            .run()
            .expect("traversal");

        let contents = traversal
            .messages
            .iter()
            .map(|m| m.content.clone())
            .collect::<Vec<_>>();
        assert_eq!(contents, expected_contents(4));
    }

    #[test]
    fn detached_view_is_an_extraction_failure() {
        let mut view = DetachedView;
        let mut clock = clock();

        let err = Loader::new(&mut view, &mut clock, LoaderConfig::immediate())
            .run()
            .expect_err("must fail");

        assert!(matches!(err, GemxError::ExtractionFailure { .. }));
        assert!(format!("{err}").contains("measuring the scroll region"));
    }

    #[test]
    fn step_exposes_each_transition() {
        let mut view = ReplayView::new(windows(2), 100.0);
        let mut clock = clock();
        let mut loader = Loader::new(&mut view, &mut clock, LoaderConfig::immediate());

        assert_eq!(loader.state(), LoaderState::Initializing);
        assert_eq!(loader.step().expect("step"), LoaderState::Settling);
        assert_eq!(loader.step().expect("step"), LoaderState::Advancing);
        assert_eq!(loader.collected(), 3);
        assert_eq!(loader.step().expect("step"), LoaderState::Stabilizing);
        assert_eq!(loader.step().expect("step"), LoaderState::Advancing);
        assert_eq!(loader.collected(), 4);

        // 100 -> 20 -> 0: the second advance lands exactly on the origin
        assert_eq!(loader.step().expect("step"), LoaderState::Stabilizing);
        assert_eq!(loader.step().expect("step"), LoaderState::Advancing);
        assert_eq!(
            loader.step().expect("step"),
            LoaderState::Terminal(TerminalReason::ReachedOrigin)
        );
        assert_eq!(
            loader.step().expect("step"),
            LoaderState::Terminal(TerminalReason::ReachedOrigin)
        );
    }

    fn region(handle: &str, class_name: &str, rect: Rect, depth: Option<usize>) -> ScrollRegion {
        ScrollRegion {
            handle: handle.to_string(),
            class_name: class_name.to_string(),
            rect,
            metrics: ScrollMetrics {
                scroll_top: 0.0,
                scroll_height: 5000.0,
                client_height: 800.0,
            },
            message_depth: depth,
        }
    }

    #[test]
    fn scroll_target_prefers_nearest_message_ancestor() {
        let wide = Rect {
            left: 300.0,
            top: 0.0,
            width: 1200.0,
            height: 900.0,
        };
        let regions = vec![
            region("outer", "chat-history", wide, Some(6)),
            region("inner", "plain", wide, Some(2)),
        ];
        assert_eq!(
            resolve_scroll_target(&regions),
            ScrollTarget::Region("inner".to_string())
        );
    }

    #[test]
    fn scroll_target_falls_back_through_patterns_area_and_viewport() {
        let sidebar = Rect {
            left: 0.0,
            top: 0.0,
            width: 300.0,
            height: 5000.0,
        };
        let small = Rect {
            left: 400.0,
            top: 0.0,
            width: 200.0,
            height: 200.0,
        };
        let large = Rect {
            left: 400.0,
            top: 0.0,
            width: 900.0,
            height: 800.0,
        };

        let patterned = vec![
            region("side", "nav", sidebar, None),
            region("hist", "Chat-History-Scroll", small, None),
        ];
        assert_eq!(
            resolve_scroll_target(&patterned),
            ScrollTarget::Region("hist".to_string())
        );

        let by_area = vec![
            region("side", "nav", sidebar, None),
            region("small", "a", small, None),
            region("large", "b", large, None),
        ];
        assert_eq!(
            resolve_scroll_target(&by_area),
            ScrollTarget::Region("large".to_string())
        );

        let mut flat = region("flat", "chat-history", large, Some(1));
        flat.metrics.scroll_height = flat.metrics.client_height;
        assert_eq!(resolve_scroll_target(&[flat]), ScrollTarget::Viewport);
        assert_eq!(resolve_scroll_target(&[]), ScrollTarget::Viewport);
    }

    #[test]
    fn immediate_config_never_waits() {
        let config = LoaderConfig::immediate();
        assert_eq!(config.initial_settle, Duration::ZERO);
        assert_eq!(config.poll_interval, Duration::ZERO);
        assert_eq!(config.final_delay, Duration::ZERO);
        assert_eq!(config.max_steps, LoaderConfig::default().max_steps);
    }
}
