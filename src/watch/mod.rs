use crate::config::Config;
use crate::core::engine::AnalysisEngine;
use crate::fixer::AutoFixer;
use crate::models::Issue;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Single-run scheduling for watch mode, kept free of I/O so the
/// debounce and queueing rules are testable with a fake clock.
///
/// Each changed file debounces on its own timer; a new change resets
/// it. When a timer fires while no run is active, that file becomes the
/// run. When it fires mid-run, the file queues de-duplicated and runs
/// one at a time after the current run completes. At most one run is
/// ever in flight, which keeps fixer writes and analysis reads from
/// racing.
#[derive(Debug)]
pub struct Scheduler {
    debounce: Duration,
    /// Per-file deadline; every new change to a file pushes it out.
    pending: BTreeMap<PathBuf, Instant>,
    queue: VecDeque<PathBuf>,
    analyzing: bool,
}

impl Scheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: BTreeMap::new(),
            queue: VecDeque::new(),
            analyzing: false,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    pub fn on_change(&mut self, path: &Path, now: Instant) {
        self.pending.insert(path.to_path_buf(), now + self.debounce);
    }

    /// Fires every expired timer. Returns the file to analyze now, if
    /// any; the rest queue behind the run this call starts (or the one
    /// already in flight).
    pub fn due(&mut self, now: Instant) -> Option<PathBuf> {
        let mut expired: Vec<(Instant, PathBuf)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, deadline)| (*deadline, path.clone()))
            .collect();
        expired.sort();

        let mut next_run = None;
        for (_, path) in expired {
            self.pending.remove(&path);
            if !self.analyzing && next_run.is_none() {
                self.analyzing = true;
                next_run = Some(path);
            } else if !self.queue.iter().any(|p| *p == path) {
                self.queue.push_back(path);
            }
        }
        next_run
    }

    /// Ends the in-flight run and hands back the next queued file, one
    /// at a time, never as a batch.
    pub fn complete(&mut self) -> Option<PathBuf> {
        self.analyzing = false;
        let next = self.queue.pop_front()?;
        self.analyzing = true;
        Some(next)
    }
}

/// Running aggregates printed after every watch-mode run. In-memory
/// only; they reset with the process.
#[derive(Debug, Default, Clone)]
pub struct WatchStats {
    pub runs: u64,
    pub issues_found: u64,
    pub fixes_applied: u64,
    avg_duration_ms: f64,
}

impl WatchStats {
    pub fn record(&mut self, issues: usize, fixed: usize, duration_ms: u64) {
        self.runs += 1;
        self.issues_found += issues as u64;
        self.fixes_applied += fixed as u64;
        self.avg_duration_ms +=
            (duration_ms as f64 - self.avg_duration_ms) / self.runs as f64;
    }

    pub fn average_duration_ms(&self) -> f64 {
        self.avg_duration_ms
    }
}

impl std::fmt::Display for WatchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "runs: {} | issues: {} | fixed: {} | avg: {:.0}ms",
            self.runs, self.issues_found, self.fixes_applied, self.avg_duration_ms
        )
    }
}

/// Blocks watching the configured paths, re-running analysis per
/// changed file after its debounce window closes. Returns only when
/// the watcher channel fails; stats are printed after every run so the
/// totals survive however the process ends.
pub fn run_watch(config: &Config) -> Result<(), String> {
    let mut engine = AnalysisEngine::new(config);
    engine.register_built_in_agents();

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(config.debounce_ms), tx)
        .map_err(|e| format!("could not start file watcher: {}", e))?;
    for path in config.effective_paths() {
        debouncer
            .watcher()
            .watch(&path, RecursiveMode::Recursive)
            .map_err(|e| format!("could not watch '{}': {}", path.display(), e))?;
    }

    // The debouncer already coalesced events for debounce_ms, so the
    // scheduler's own window is zero: delivery means the timer fired.
    let mut scheduler = Scheduler::new(Duration::ZERO);
    let mut stats = WatchStats::default();

    println!(
        "Watching {} path(s); debounce {}ms. Press Ctrl+C to stop.",
        config.effective_paths().len(),
        config.debounce_ms
    );
    // Initial run covers the whole configured path set.
    run_once(&engine, config, &config.effective_paths(), &mut stats);

    loop {
        let result = rx
            .recv()
            .map_err(|_| format!("watcher stopped; final stats: {}", stats))?;
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                eprintln!("Warning: watch error: {}", e);
                continue;
            }
        };

        let now = Instant::now();
        for event in &events {
            scheduler.on_change(&event.path, now);
        }

        let Some(mut current) = scheduler.due(now) else {
            continue;
        };
        loop {
            println!("Change detected: {}; re-analyzing...", current.display());
            run_once(&engine, config, &[current.clone()], &mut stats);
            match scheduler.complete() {
                Some(next) => current = next,
                None => break,
            }
        }
    }
}

/// One analysis pass over `paths`. Analysis errors are reported and
/// swallowed; the watch loop outlives them.
fn run_once(engine: &AnalysisEngine, config: &Config, paths: &[PathBuf], stats: &mut WatchStats) {
    let report = match engine.analyze_paths(paths) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Warning: analysis failed: {}", e);
            return;
        }
    };

    let fixed = if config.fix {
        let fixable: Vec<Issue> = report
            .active_findings()
            .map(|f| f.issue.clone())
            .collect();
        AutoFixer::new().apply(&fixable).fixed
    } else {
        0
    };

    stats.record(report.summary.total_issues, fixed, report.duration_ms);
    println!(
        "Analyzed {} file(s) in {}ms: {} issue(s), {} critical, {} high",
        report.analyzed_files.len(),
        report.duration_ms,
        report.summary.total_issues,
        report.summary.critical,
        report.summary.high
    );
    println!("Watch totals: {}", stats);
}
