// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use edcp_core::{
    AlgorithmInfo, AlgorithmOption, ChangeDetector, ChangePoint, ChangePointResult, CpdError,
    DetectionOutcome, Diagnostics, ExecutionContext, PermutationStats, SeriesView,
};
use edcp_stats::{MIN_QHAT_LEN, extract_arg_max, qhat};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::borrow::Cow;
use std::time::Instant;

const DEFAULT_SIGNIFICANCE: f64 = 0.05;
const DEFAULT_PERMUTATIONS: usize = 100;
const DEFAULT_SEED: u64 = 1234;
const DEFAULT_CANCEL_CHECK_EVERY: usize = 1;

pub const E_DIVISIVE_NAME: &str = "e_divisive";
pub const E_DIVISIVE_VERSION: u32 = 1;

/// Configuration for [`EDivisive`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct EDivisiveConfig {
    /// Largest p-value at which a candidate is accepted, in `(0, 1]`.
    pub significance: f64,
    /// Shuffled trials per significance test.
    pub permutations: usize,
    pub seed: u64,
    /// Permutation trials between cancellation/time-budget polls.
    pub cancel_check_every: usize,
}

impl Default for EDivisiveConfig {
    fn default() -> Self {
        Self {
            significance: DEFAULT_SIGNIFICANCE,
            permutations: DEFAULT_PERMUTATIONS,
            seed: DEFAULT_SEED,
            cancel_check_every: DEFAULT_CANCEL_CHECK_EVERY,
        }
    }
}

impl EDivisiveConfig {
    fn validate(&self) -> Result<(), CpdError> {
        if !self.significance.is_finite() || self.significance <= 0.0 || self.significance > 1.0 {
            return Err(CpdError::invalid_input(format!(
                "EDivisiveConfig.significance must be in (0, 1]; got {}",
                self.significance
            )));
        }

        if self.permutations == 0 {
            return Err(CpdError::invalid_input(
                "EDivisiveConfig.permutations must be >= 1; got 0",
            ));
        }

        Ok(())
    }

    fn normalized_cancel_check_every(&self) -> usize {
        self.cancel_check_every.max(1)
    }
}

/// Half-open index range `[start, end)` searched independently for a split.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when splitting at `index` leaves both halves non-empty.
    pub fn contains_split(&self, index: usize) -> bool {
        self.start < index && index < self.end
    }
}

/// Strongest split found so far inside one window.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub statistic: f64,
    pub window: Window,
}

/// A candidate that passed its significance test.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceptedChangePoint {
    pub index: usize,
    pub statistic: f64,
    /// Estimated p-value of the permutation test.
    pub probability: f64,
    /// Zero-based acceptance sequence number.
    pub order: usize,
    pub window: Window,
}

/// Splits the window strictly containing `index` into `[start, index)` and
/// `[index, end)`.
///
/// With no windows yet, returns the single window `[0, n)`. The result is
/// sorted by start and tiles `[0, n)` whenever the input does.
pub fn split_windows(windows: &[Window], index: usize, n: usize) -> Result<Vec<Window>, CpdError> {
    if windows.is_empty() {
        return Ok(vec![Window { start: 0, end: n }]);
    }

    let pos = windows
        .iter()
        .position(|w| w.contains_split(index))
        .ok_or_else(|| {
            CpdError::invalid_input(format!("no window strictly contains split index {index}"))
        })?;

    let mut out = Vec::with_capacity(windows.len() + 1);
    out.extend_from_slice(windows);
    let old_end = out[pos].end;
    out[pos].end = index;
    out.push(Window {
        start: index,
        end: old_end,
    });
    out.sort_by_key(|w| w.start);
    Ok(out)
}

fn best_candidate(series: &[f64], window: Window) -> Candidate {
    let best = extract_arg_max(&qhat(&series[window.start..window.end]));
    Candidate {
        index: window.start + best.index,
        statistic: best.value,
        window,
    }
}

/// Re-scores the candidate list after a split at `accepted`.
///
/// With no candidates yet, scores the whole series. Otherwise the candidate
/// at `accepted` is replaced by the best splits of the two halves of its
/// window. The result is sorted ascending by statistic, so the last entry
/// is the strongest outstanding candidate.
pub fn refresh_candidates(
    series: &[f64],
    candidates: &[Candidate],
    accepted: usize,
) -> Result<Vec<Candidate>, CpdError> {
    if candidates.is_empty() {
        let whole = Window {
            start: 0,
            end: series.len(),
        };
        return Ok(vec![best_candidate(series, whole)]);
    }

    let pos = candidates
        .iter()
        .rposition(|c| c.index == accepted)
        .ok_or_else(|| {
            CpdError::invalid_input(format!("no candidate at accepted index {accepted}"))
        })?;
    let window = candidates[pos].window;
    if !window.contains_split(accepted) || window.end > series.len() {
        return Err(CpdError::invalid_input(format!(
            "candidate window [{}, {}) cannot be split at {accepted} for series of length {}",
            window.start,
            window.end,
            series.len()
        )));
    }

    let mut out = candidates.to_vec();
    out[pos] = best_candidate(
        series,
        Window {
            start: window.start,
            end: accepted,
        },
    );
    out.push(best_candidate(
        series,
        Window {
            start: accepted,
            end: window.end,
        },
    ));
    out.sort_by(|a, b| a.statistic.total_cmp(&b.statistic));
    Ok(out)
}

/// Snapshot of the hierarchical search: open windows and one candidate each.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchState {
    windows: Vec<Window>,
    candidates: Vec<Candidate>,
}

impl SearchState {
    /// Whole-series window with its best split as the only candidate.
    pub fn initial(series: &[f64]) -> Result<Self, CpdError> {
        Ok(Self {
            windows: split_windows(&[], 0, series.len())?,
            candidates: refresh_candidates(series, &[], 0)?,
        })
    }

    /// Returns the state after accepting a split at `index`.
    pub fn split_at(&self, series: &[f64], index: usize) -> Result<Self, CpdError> {
        Ok(Self {
            windows: split_windows(&self.windows, index, series.len())?,
            candidates: refresh_candidates(series, &self.candidates, index)?,
        })
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Strongest outstanding candidate.
    pub fn proposal(&self) -> Option<&Candidate> {
        self.candidates.last()
    }
}

/// Result of one permutation significance test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignificanceTest {
    /// `(1 + exceed_count) / (trials + 1)`.
    pub p_value: f64,
    pub exceed_count: usize,
    pub trials: usize,
}

struct RunControls<'c, 'a> {
    ctx: &'c ExecutionContext<'a>,
    started_at: Instant,
    every: usize,
    iteration: usize,
    stats: PermutationStats,
}

impl<'c, 'a> RunControls<'c, 'a> {
    fn new(ctx: &'c ExecutionContext<'a>, every: usize) -> Self {
        Self {
            ctx,
            started_at: Instant::now(),
            every,
            iteration: 0,
            stats: PermutationStats::default(),
        }
    }

    fn tick(&mut self) -> Result<(), CpdError> {
        checked_counter_increment(&mut self.iteration, "iteration")?;
        self.ctx
            .check_runtime_controls(self.iteration, self.every, self.started_at)
    }
}

fn checked_counter_increment(counter: &mut usize, name: &str) -> Result<(), CpdError> {
    *counter = counter
        .checked_add(1)
        .ok_or_else(|| CpdError::resource_limit(format!("{name} counter overflow")))?;
    Ok(())
}

/// Estimates how often shuffled windows score at least `observed`.
///
/// Each trial shuffles an independent copy of every window, takes the
/// strongest split statistic across all windows and counts the trial when
/// it reaches `observed`. The add-one estimate keeps the p-value inside
/// `[1 / (permutations + 1), 1]`.
pub fn permutation_test<R: Rng + ?Sized>(
    series: &[f64],
    windows: &[Window],
    observed: f64,
    permutations: usize,
    rng: &mut R,
) -> Result<SignificanceTest, CpdError> {
    let ctx = ExecutionContext::new();
    let mut controls = RunControls::new(&ctx, DEFAULT_CANCEL_CHECK_EVERY);
    run_permutation_test(series, windows, observed, permutations, rng, &mut controls)
}

fn run_permutation_test<R: Rng + ?Sized>(
    series: &[f64],
    windows: &[Window],
    observed: f64,
    permutations: usize,
    rng: &mut R,
    controls: &mut RunControls<'_, '_>,
) -> Result<SignificanceTest, CpdError> {
    if permutations == 0 {
        return Err(CpdError::invalid_input(
            "permutation test requires permutations >= 1; got 0",
        ));
    }
    if let Some(w) = windows
        .iter()
        .find(|w| w.start > w.end || w.end > series.len())
    {
        return Err(CpdError::invalid_input(format!(
            "window [{}, {}) out of range for series of length {}",
            w.start,
            w.end,
            series.len()
        )));
    }

    let widest = windows.iter().map(Window::len).max().unwrap_or(0);
    let mut buffer = Vec::with_capacity(widest);
    let mut exceed_count = 0usize;

    for _ in 0..permutations {
        controls.tick()?;

        let mut max_shuffled = f64::NEG_INFINITY;
        for window in windows {
            // Shorter windows always score zero; skip the shuffle.
            let value = if window.len() < MIN_QHAT_LEN {
                0.0
            } else {
                buffer.clear();
                buffer.extend_from_slice(&series[window.start..window.end]);
                buffer.shuffle(rng);
                checked_counter_increment(
                    &mut controls.stats.windows_shuffled,
                    "windows_shuffled",
                )?;
                extract_arg_max(&qhat(&buffer)).value
            };
            max_shuffled = max_shuffled.max(value);
        }

        if max_shuffled >= observed {
            exceed_count += 1;
        }
        checked_counter_increment(&mut controls.stats.trials_run, "trials_run")?;
    }
    checked_counter_increment(&mut controls.stats.tests_run, "tests_run")?;

    let p_value = (1 + exceed_count) as f64 / (permutations + 1) as f64;
    tracing::trace!(
        observed,
        exceed_count,
        permutations,
        p_value,
        "permutation test"
    );

    Ok(SignificanceTest {
        p_value,
        exceed_count,
        trials: permutations,
    })
}

/// Outcome of testing the strongest outstanding candidate.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    Accept(AcceptedChangePoint),
    Reject { proposal: Candidate, p_value: f64 },
    /// No candidate with a positive statistic remains.
    Exhausted,
}

/// Why an E-Divisive search stopped.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StopReason {
    InsufficientData,
    Exhausted,
    NotSignificant { p_value: f64 },
}

/// Accepted change points in acceptance order plus run bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct EDivisiveSearch {
    pub accepted: Vec<AcceptedChangePoint>,
    pub stop: StopReason,
    pub stats: PermutationStats,
}

/// E-Divisive detector: hierarchical energy-statistic splits validated by
/// permutation tests.
#[derive(Debug)]
pub struct EDivisive {
    config: EDivisiveConfig,
}

impl EDivisive {
    pub fn new(config: EDivisiveConfig) -> Result<Self, CpdError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EDivisiveConfig {
        &self.config
    }

    /// Name, version and options stamped on every reported change point.
    pub fn algorithm_info(&self) -> AlgorithmInfo {
        AlgorithmInfo {
            name: E_DIVISIVE_NAME.to_string(),
            version: E_DIVISIVE_VERSION,
            options: vec![
                AlgorithmOption::new("pvalue", self.config.significance),
                AlgorithmOption::new("permutations", self.config.permutations),
                AlgorithmOption::new("seed", self.config.seed),
            ],
        }
    }

    /// Runs the search with a generator seeded from the config.
    pub fn search(
        &self,
        x: &SeriesView<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<EDivisiveSearch, CpdError> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.search_with_rng(x, ctx, &mut rng)
    }

    /// Runs the search drawing every shuffle from `rng`.
    pub fn search_with_rng<R: Rng + ?Sized>(
        &self,
        x: &SeriesView<'_>,
        ctx: &ExecutionContext<'_>,
        rng: &mut R,
    ) -> Result<EDivisiveSearch, CpdError> {
        self.config.validate()?;

        let series = x.values();
        if series.len() < MIN_QHAT_LEN {
            tracing::debug!(n = series.len(), "series too short for e-divisive");
            return Ok(EDivisiveSearch {
                accepted: vec![],
                stop: StopReason::InsufficientData,
                stats: PermutationStats::default(),
            });
        }

        let mut controls = RunControls::new(ctx, self.config.normalized_cancel_check_every());
        let mut state = SearchState::initial(series)?;
        let mut accepted: Vec<AcceptedChangePoint> = Vec::new();

        let stop = loop {
            match self.step(series, &state, accepted.len(), rng, &mut controls)? {
                Transition::Accept(change_point) => {
                    tracing::debug!(
                        index = change_point.index,
                        statistic = change_point.statistic,
                        p_value = change_point.probability,
                        order = change_point.order,
                        "accepted change point"
                    );
                    state = state.split_at(series, change_point.index)?;
                    accepted.push(change_point);
                }
                Transition::Reject { proposal, p_value } => {
                    tracing::debug!(
                        index = proposal.index,
                        statistic = proposal.statistic,
                        p_value,
                        "candidate not significant"
                    );
                    break StopReason::NotSignificant { p_value };
                }
                Transition::Exhausted => break StopReason::Exhausted,
            }
        };

        accepted.sort_by_key(|cp| cp.order);
        tracing::debug!(
            ?stop,
            accepted = accepted.len(),
            "e-divisive search finished"
        );

        Ok(EDivisiveSearch {
            accepted,
            stop,
            stats: controls.stats,
        })
    }

    fn step<R: Rng + ?Sized>(
        &self,
        series: &[f64],
        state: &SearchState,
        order: usize,
        rng: &mut R,
        controls: &mut RunControls<'_, '_>,
    ) -> Result<Transition, CpdError> {
        let Some(proposal) = state.proposal().copied() else {
            return Ok(Transition::Exhausted);
        };
        if !proposal.statistic.is_finite() {
            return Err(CpdError::numerical_issue(format!(
                "non-finite split statistic at index {}: {}",
                proposal.index, proposal.statistic
            )));
        }
        if proposal.statistic <= 0.0 {
            return Ok(Transition::Exhausted);
        }

        let test = run_permutation_test(
            series,
            state.windows(),
            proposal.statistic,
            self.config.permutations,
            rng,
            controls,
        )?;

        if test.p_value <= self.config.significance {
            Ok(Transition::Accept(AcceptedChangePoint {
                index: proposal.index,
                statistic: proposal.statistic,
                probability: test.p_value,
                order,
                window: proposal.window,
            }))
        } else {
            Ok(Transition::Reject {
                proposal,
                p_value: test.p_value,
            })
        }
    }
}

impl ChangeDetector for EDivisive {
    fn detect(
        &self,
        x: &SeriesView<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ChangePointResult, CpdError> {
        let started_at = Instant::now();
        let search = self.search(x, ctx)?;
        let runtime_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut notes = Vec::with_capacity(search.accepted.len() + 2);
        notes.push(format!("stop={:?}", search.stop));
        for cp in &search.accepted {
            notes.push(format!(
                "accepted[{}]: index={}, statistic={}, p_value={}, window=[{}, {})",
                cp.order, cp.index, cp.statistic, cp.probability, cp.window.start, cp.window.end
            ));
        }
        notes.push(format!(
            "tests_run={}, trials_run={}, windows_shuffled={}",
            search.stats.tests_run, search.stats.trials_run, search.stats.windows_shuffled
        ));

        let outcome = match search.stop {
            StopReason::InsufficientData => DetectionOutcome::InsufficientData {
                n: x.len(),
                required: MIN_QHAT_LEN,
            },
            _ if search.accepted.is_empty() => DetectionOutcome::NoChange,
            _ => DetectionOutcome::Detected,
        };

        let info = self.algorithm_info();
        let change_points = search
            .accepted
            .iter()
            .map(|cp| ChangePoint {
                index: cp.index,
                info: info.clone(),
            })
            .collect();

        let diagnostics = Diagnostics {
            n: x.len(),
            runtime_ms: Some(runtime_ms),
            notes,
            algorithm: Cow::Borrowed(E_DIVISIVE_NAME),
            seed: Some(self.config.seed),
            #[cfg(feature = "serde")]
            params_json: serde_json::to_value(&self.config).ok(),
            permutation_stats: Some(search.stats),
            ..Diagnostics::default()
        };

        ChangePointResult::new(x.len(), change_points, outcome, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Candidate, EDivisive, EDivisiveConfig, RunControls, SearchState, StopReason, Transition,
        Window, permutation_test, refresh_candidates, split_windows,
    };
    use edcp_core::{
        CancelToken, ChangeDetector, CpdError, DetectionOutcome, ExecutionContext, SeriesView,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn steps(levels: &[(f64, usize)]) -> Vec<f64> {
        let mut out = Vec::new();
        for &(level, len) in levels {
            out.extend(std::iter::repeat_n(level, len));
        }
        out
    }

    fn config(significance: f64, permutations: usize) -> EDivisiveConfig {
        EDivisiveConfig {
            significance,
            permutations,
            ..EDivisiveConfig::default()
        }
    }

    #[test]
    fn config_defaults_and_validation() {
        let default_cfg = EDivisiveConfig::default();
        assert_eq!(default_cfg.significance, 0.05);
        assert_eq!(default_cfg.permutations, 100);
        assert_eq!(default_cfg.seed, 1234);
        EDivisive::new(default_cfg).expect("default config should be valid");

        for significance in [0.0, -0.1, 1.5, f64::NAN] {
            let err = EDivisive::new(config(significance, 10))
                .expect_err("significance outside (0, 1] must fail");
            assert!(err.to_string().contains("significance"));
        }
        EDivisive::new(config(1.0, 10)).expect("significance of 1 is allowed");

        let err = EDivisive::new(config(0.05, 0)).expect_err("zero permutations must fail");
        assert!(err.to_string().contains("permutations must be >= 1"));
    }

    #[test]
    fn split_windows_creates_whole_range_first() {
        let windows = split_windows(&[], 0, 12).expect("initial split");
        assert_eq!(windows, vec![Window { start: 0, end: 12 }]);
    }

    #[test]
    fn split_windows_keeps_tiling_sorted() {
        let windows = split_windows(&[], 0, 12).expect("initial split");
        let windows = split_windows(&windows, 8, 12).expect("split at 8");
        let windows = split_windows(&windows, 3, 12).expect("split at 3");
        assert_eq!(
            windows,
            vec![
                Window { start: 0, end: 3 },
                Window { start: 3, end: 8 },
                Window { start: 8, end: 12 },
            ]
        );
    }

    #[test]
    fn split_windows_rejects_boundary_index() {
        let windows = vec![Window { start: 0, end: 4 }, Window { start: 4, end: 9 }];
        let err = split_windows(&windows, 4, 9).expect_err("boundary split must fail");
        assert!(err.to_string().contains("no window strictly contains"));
        split_windows(&windows, 9, 9).expect_err("end split must fail");
    }

    #[test]
    fn refresh_candidates_scores_whole_series_first() {
        let series = steps(&[(0.0, 10), (10.0, 10)]);
        let candidates = refresh_candidates(&series, &[], 0).expect("initial candidates");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].index, 10);
        assert!((candidates[0].statistic - 100.0).abs() < 1e-9);
        assert_eq!(candidates[0].window, Window { start: 0, end: 20 });
    }

    #[test]
    fn refresh_candidates_splits_owner_and_sorts_by_statistic() {
        let series = steps(&[(0.0, 15), (10.0, 15), (30.0, 15)]);
        let initial = refresh_candidates(&series, &[], 0).expect("initial candidates");
        assert_eq!(initial[0].index, 30);

        let refreshed = refresh_candidates(&series, &initial, 30).expect("refresh at 30");
        assert_eq!(refreshed.len(), 2);
        assert!(refreshed[0].statistic <= refreshed[1].statistic);

        let tail = refreshed.last().expect("tail candidate");
        assert_eq!(tail.index, 15);
        assert!((tail.statistic - 140.0).abs() < 1e-9);
        assert_eq!(tail.window, Window { start: 0, end: 30 });

        // The constant right half has nothing to split.
        assert_eq!(
            refreshed[0],
            Candidate {
                index: 30,
                statistic: 0.0,
                window: Window { start: 30, end: 45 },
            }
        );
    }

    #[test]
    fn refresh_candidates_requires_known_index() {
        let series = steps(&[(0.0, 10), (10.0, 10)]);
        let initial = refresh_candidates(&series, &[], 0).expect("initial candidates");
        let err = refresh_candidates(&series, &initial, 7).expect_err("unknown index must fail");
        assert!(err.to_string().contains("no candidate at accepted index 7"));
    }

    #[test]
    fn search_state_transitions_are_snapshots() {
        let series = steps(&[(0.0, 15), (10.0, 15), (30.0, 15)]);
        let initial = SearchState::initial(&series).expect("initial state");
        let next = initial.split_at(&series, 30).expect("split state");

        assert_eq!(initial.windows(), &[Window { start: 0, end: 45 }]);
        assert_eq!(initial.candidates().len(), 1);
        assert_eq!(
            next.windows(),
            &[Window { start: 0, end: 30 }, Window { start: 30, end: 45 }]
        );
        assert_eq!(next.proposal().map(|c| c.index), Some(15));
    }

    #[test]
    fn permutation_p_value_stays_in_bounds() {
        let series = steps(&[(0.0, 10), (10.0, 10)]);
        let windows = [Window { start: 0, end: 20 }];
        let mut rng = StdRng::seed_from_u64(7);

        let strong = permutation_test(&series, &windows, 100.0, 49, &mut rng)
            .expect("permutation test should run");
        assert_eq!(strong.trials, 49);
        assert!(strong.p_value >= 1.0 / 50.0);
        assert!(strong.p_value <= 1.0);

        let trivial = permutation_test(&series, &windows, 0.0, 49, &mut rng)
            .expect("permutation test should run");
        assert_eq!(trivial.exceed_count, 49);
        assert_eq!(trivial.p_value, 1.0);
    }

    #[test]
    fn perfectly_separated_step_is_never_reached_by_shuffles() {
        let series = steps(&[(0.0, 10), (10.0, 10)]);
        let windows = [Window { start: 0, end: 20 }];
        let mut rng = StdRng::seed_from_u64(99);
        let test = permutation_test(&series, &windows, 100.0, 49, &mut rng)
            .expect("permutation test should run");
        assert_eq!(test.exceed_count, 0);
        assert!((test.p_value - 0.02).abs() < 1e-12);
    }

    #[test]
    fn permutation_test_rejects_zero_trials_and_bad_windows() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut rng = StdRng::seed_from_u64(1);
        permutation_test(&series, &[Window { start: 0, end: 6 }], 1.0, 0, &mut rng)
            .expect_err("zero permutations must fail");
        let err = permutation_test(&series, &[Window { start: 2, end: 9 }], 1.0, 3, &mut rng)
            .expect_err("out-of-range window must fail");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn step_accepts_then_exhausts_on_constant_windows() {
        let series = steps(&[(0.0, 10), (10.0, 10)]);
        let detector = EDivisive::new(config(0.05, 49)).expect("valid config");
        let ctx = ExecutionContext::new();
        let mut controls = RunControls::new(&ctx, 1);
        let mut rng = StdRng::seed_from_u64(3);

        let state = SearchState::initial(&series).expect("initial state");
        let accepted = match detector
            .step(&series, &state, 0, &mut rng, &mut controls)
            .expect("step should run")
        {
            Transition::Accept(cp) => cp,
            other => panic!("expected acceptance, got {other:?}"),
        };
        assert_eq!(accepted.index, 10);
        assert_eq!(accepted.order, 0);

        let state = state.split_at(&series, accepted.index).expect("split");
        let next = detector
            .step(&series, &state, 1, &mut rng, &mut controls)
            .expect("step should run");
        assert_eq!(next, Transition::Exhausted);
        assert_eq!(controls.stats.tests_run, 1);
        assert_eq!(controls.stats.trials_run, 49);
    }

    #[test]
    fn step_rejects_when_significance_is_unreachable() {
        let series = steps(&[(0.0, 10), (10.0, 10)]);
        // With 3 trials the smallest possible p-value is 0.25.
        let detector = EDivisive::new(config(0.1, 3)).expect("valid config");
        let ctx = ExecutionContext::new();
        let mut controls = RunControls::new(&ctx, 1);
        let mut rng = StdRng::seed_from_u64(3);
        let state = SearchState::initial(&series).expect("initial state");

        match detector
            .step(&series, &state, 0, &mut rng, &mut controls)
            .expect("step should run")
        {
            Transition::Reject { proposal, p_value } => {
                assert_eq!(proposal.index, 10);
                assert!(p_value >= 0.25);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn two_regimes_yield_single_change_point() {
        let series = steps(&[(0.0, 10), (10.0, 10)]);
        let detector = EDivisive::new(config(0.05, 49)).expect("valid config");
        let view = SeriesView::new(&series).expect("valid series");
        let search = detector
            .search(&view, &ExecutionContext::new())
            .expect("search should run");

        assert_eq!(search.accepted.len(), 1);
        let cp = search.accepted[0];
        assert_eq!(cp.index, 10);
        assert!((cp.statistic - 100.0).abs() < 1e-9);
        assert!((cp.probability - 0.02).abs() < 1e-12);
        assert_eq!(search.stop, StopReason::Exhausted);
    }

    #[test]
    fn three_regimes_are_reported_in_acceptance_order() {
        let series = steps(&[(0.0, 15), (10.0, 15), (30.0, 15)]);
        let detector = EDivisive::new(config(0.05, 49)).expect("valid config");
        let result = detector
            .detect(
                &SeriesView::new(&series).expect("valid series"),
                &ExecutionContext::new(),
            )
            .expect("detect should run");

        assert_eq!(result.indices(), vec![30, 15]);
        assert_eq!(result.outcome, DetectionOutcome::Detected);
        assert_eq!(result.diagnostics.algorithm, "e_divisive");
        assert_eq!(result.diagnostics.seed, Some(1234));
        let stats = result
            .diagnostics
            .permutation_stats
            .clone()
            .expect("permutation stats recorded");
        assert_eq!(stats.tests_run, 2);
        assert_eq!(stats.trials_run, 98);
        assert!(result.diagnostics.notes[0].starts_with("stop=Exhausted"));
        assert_eq!(result.change_points[0].info.name, "e_divisive");
        assert_eq!(result.change_points[0].info.options.len(), 3);
    }

    #[test]
    fn constant_series_has_no_change_points() {
        let series = [5.0; 6];
        for significance in [0.05, 0.5, 0.99] {
            let detector = EDivisive::new(config(significance, 20)).expect("valid config");
            let result = detector
                .detect(
                    &SeriesView::new(&series).expect("valid series"),
                    &ExecutionContext::new(),
                )
                .expect("detect should run");
            assert!(result.change_points.is_empty());
            assert_eq!(result.outcome, DetectionOutcome::NoChange);
        }
    }

    #[test]
    fn significance_of_one_still_terminates() {
        let series = steps(&[(0.0, 8), (4.0, 8), (1.0, 8)]);
        let detector = EDivisive::new(config(1.0, 5)).expect("valid config");
        let search = detector
            .search(
                &SeriesView::new(&series).expect("valid series"),
                &ExecutionContext::new(),
            )
            .expect("search should run");
        assert_eq!(search.stop, StopReason::Exhausted);
        for (order, cp) in search.accepted.iter().enumerate() {
            assert_eq!(cp.order, order);
            assert!(cp.index > 0 && cp.index < series.len());
        }
    }

    #[test]
    fn short_series_reports_insufficient_data() {
        let detector = EDivisive::new(EDivisiveConfig::default()).expect("valid config");
        for len in 0..5 {
            let series = vec![1.0; len];
            let result = detector
                .detect(
                    &SeriesView::new(&series).expect("valid series"),
                    &ExecutionContext::new(),
                )
                .expect("detect should run");
            assert!(result.change_points.is_empty());
            assert_eq!(
                result.outcome,
                DetectionOutcome::InsufficientData {
                    n: len,
                    required: 5
                }
            );
        }
    }

    #[test]
    fn same_seed_reproduces_results() {
        let series = steps(&[(0.0, 8), (3.0, 8), (1.0, 8), (5.0, 8)]);
        let detector = EDivisive::new(EDivisiveConfig {
            significance: 0.2,
            permutations: 30,
            seed: 42,
            cancel_check_every: 1,
        })
        .expect("valid config");
        let view = SeriesView::new(&series).expect("valid series");
        let first = detector
            .search(&view, &ExecutionContext::new())
            .expect("first run");
        let second = detector
            .search(&view, &ExecutionContext::new())
            .expect("second run");
        assert_eq!(first, second);
    }

    #[test]
    fn cancellation_stops_the_search() {
        let series = steps(&[(0.0, 10), (10.0, 10)]);
        let detector = EDivisive::new(config(0.05, 49)).expect("valid config");
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = ExecutionContext::new().with_cancel(&cancel);
        let err = detector
            .detect(&SeriesView::new(&series).expect("valid series"), &ctx)
            .expect_err("cancelled run must fail");
        assert_eq!(err, CpdError::Cancelled);
    }

    #[test]
    fn detect_changes_returns_wire_change_points() {
        let series = steps(&[(0.0, 10), (10.0, 10)]);
        let detector = EDivisive::new(config(0.05, 49)).expect("valid config");
        let change_points = detector.detect_changes(&series).expect("detect should run");
        assert_eq!(change_points.len(), 1);
        assert_eq!(change_points[0].index, 10);
        assert_eq!(change_points[0].info.version, 1);
    }
}
