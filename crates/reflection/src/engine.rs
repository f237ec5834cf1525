//! Reflection engine - explains experiences and mines patterns.

use crate::advisor::{advise, Advisor};
use crate::{Analyzer, Pattern, PatternMiner};
use evolve_core::{Context, Experience, ExperienceId, Time, Value};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Longest advice excerpt kept in a combined reflection.
const ADVICE_EXCERPT_CHARS: usize = 200;

/// Confidence attached to heuristic reflections.
const HEURISTIC_CONFIDENCE: f64 = 0.8;

/// Configuration for the reflection engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionConfig {
    /// Reflection records kept in history
    pub history_limit: usize,
    /// Deadline for one advisory call, in milliseconds
    pub advisory_timeout_ms: u64,
    /// Whether an attached advisor is consulted
    pub advisory_enabled: bool,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            history_limit: 500,
            advisory_timeout_ms: 2000,
            advisory_enabled: true,
        }
    }
}

impl ReflectionConfig {
    /// Advisory deadline as a duration.
    pub fn advisory_timeout(&self) -> Duration {
        Duration::from_millis(self.advisory_timeout_ms)
    }
}

/// Whether a reflection explains a success or a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionKind {
    /// Explains a success
    SuccessAnalysis,
    /// Explains a failure
    FailureAnalysis,
}

/// One entry of the reflection history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionRecord {
    /// Experience reflected on
    pub experience_id: ExperienceId,
    /// Reflection text
    pub reflection: String,
    /// Success or failure analysis
    pub kind: ReflectionKind,
    /// When the reflection was made
    pub timestamp: Time,
    /// Confidence in the reflection
    pub confidence: f64,
}

/// Generates reflections from experiences.
pub struct ReflectionEngine {
    analyzer: Analyzer,
    miner: PatternMiner,
    advisor: Option<Arc<dyn Advisor>>,
    history: Mutex<VecDeque<ReflectionRecord>>,
    pattern_cache: Mutex<HashMap<String, Vec<Pattern>>>,
    config: ReflectionConfig,
}

impl ReflectionEngine {
    /// Create a new reflection engine.
    pub fn new() -> Self {
        Self {
            analyzer: Analyzer::new(),
            miner: PatternMiner::new(),
            advisor: None,
            history: Mutex::new(VecDeque::new()),
            pattern_cache: Mutex::new(HashMap::new()),
            config: ReflectionConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ReflectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the pattern miner.
    pub fn with_miner(mut self, miner: PatternMiner) -> Self {
        self.miner = miner;
        self
    }

    /// Attach an advisory collaborator.
    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ReflectionConfig {
        &self.config
    }

    fn active_advisor(&self) -> Option<Arc<dyn Advisor>> {
        self.advisor
            .as_ref()
            .filter(|_| self.config.advisory_enabled)
            .cloned()
    }

    /// Heuristic reflection on an experience. Records it in history.
    pub fn reflect_on_experience(&self, experience: &Experience) -> String {
        let reflection = self.analyzer.analyze(experience).render();
        self.record(experience, &reflection);
        reflection
    }

    /// Reflection supplemented by the advisor when one is attached.
    ///
    /// The result is `[reflection] <heuristic>\n\n[insight] <advice>`. The
    /// advice is cut to 200 characters; a failed call uses a fixed text.
    pub async fn reflect(&self, experience: &Experience) -> String {
        let basic = self.analyzer.analyze(experience).render();

        let reflection = match self.active_advisor() {
            Some(advisor) => {
                let prompt = format!(
                    "Analyze this experience.\ntask: {}\naction: {}\noutcome: {}\nreward: {:.2}\n\nExplain the outcome and suggest what to learn from it.",
                    experience.task,
                    experience.action,
                    if experience.success { "success" } else { "failure" },
                    experience.reward,
                );
                let mut context = Context::new();
                context.insert("task".into(), experience.task.clone().into());
                context.insert("action".into(), experience.action.clone().into());
                context.insert("success".into(), experience.success.into());
                context.insert("reward".into(), experience.reward.into());

                let advice = advise(
                    advisor,
                    prompt,
                    context,
                    "reflection",
                    self.config.advisory_timeout(),
                )
                .await;
                format!("[reflection] {}\n\n[insight] {}", basic, excerpt(advice.text()))
            }
            None => basic,
        };

        self.record(experience, &reflection);
        reflection
    }

    fn record(&self, experience: &Experience, reflection: &str) {
        let kind = if experience.success {
            ReflectionKind::SuccessAnalysis
        } else {
            ReflectionKind::FailureAnalysis
        };

        let mut history = self.history.lock();
        history.push_back(ReflectionRecord {
            experience_id: experience.id,
            reflection: reflection.to_string(),
            kind,
            timestamp: chrono::Utc::now(),
            confidence: HEURISTIC_CONFIDENCE,
        });
        while history.len() > self.config.history_limit {
            history.pop_front();
        }
        debug!("Reflected on experience {}", experience.id);
    }

    /// Mine patterns over a window of recent experiences (oldest first).
    ///
    /// The result is cached under `recent_<n>`.
    pub fn identify_patterns(&self, window: &[Experience]) -> Vec<Pattern> {
        let patterns = self.miner.identify_patterns(window);
        info!("Identified {} patterns over {} experiences", patterns.len(), window.len());
        self.pattern_cache
            .lock()
            .insert(format!("recent_{}", window.len()), patterns.clone());
        patterns
    }

    /// Patterns cached for a window of `size` experiences.
    pub fn cached_patterns(&self, size: usize) -> Option<Vec<Pattern>> {
        self.pattern_cache.lock().get(&format!("recent_{}", size)).cloned()
    }

    /// Attach advisory analysis to mined patterns as `advisory_analysis`.
    ///
    /// Does nothing without an active advisor or when there are no patterns.
    pub async fn annotate_patterns(&self, patterns: &mut [Pattern]) {
        let Some(advisor) = self.active_advisor() else {
            return;
        };
        let Some(strongest) = patterns
            .iter()
            .max_by(|a, b| a.strength.total_cmp(&b.strength))
            .map(|p| p.description.clone())
        else {
            return;
        };

        let listing: Vec<String> = patterns
            .iter()
            .map(|p| format!("- [{}] {} (strength {:.2})", p.kind, p.description, p.strength))
            .collect();
        let prompt = format!(
            "These patterns were found in recent experiences:\n{}\n\nWhat should the agent change?",
            listing.join("\n")
        );
        let mut context = Context::new();
        context.insert("pattern_count".into(), patterns.len().into());
        context.insert("strongest".into(), strongest.into());

        let advice = advise(
            advisor,
            prompt,
            context,
            "pattern_analysis",
            self.config.advisory_timeout(),
        )
        .await;
        if advice.is_available() {
            for pattern in patterns.iter_mut() {
                pattern
                    .metadata
                    .insert("advisory_analysis".into(), Value::from(advice.text()));
            }
        }
    }

    /// Most recent reflections, newest first.
    pub fn reflection_summary(&self, limit: usize) -> Vec<ReflectionRecord> {
        self.history.lock().iter().rev().take(limit).cloned().collect()
    }

    /// Drop reflections older than `max_age`. Returns how many were removed.
    pub fn cleanup_old_reflections(&self, max_age: chrono::Duration) -> usize {
        let cutoff = chrono::Utc::now() - max_age;
        let mut history = self.history.lock();
        let before = history.len();
        history.retain(|r| r.timestamp >= cutoff);
        let removed = before - history.len();
        if removed > 0 {
            info!("Removed {} old reflections", removed);
        }
        removed
    }

    /// Number of reflections in history.
    pub fn reflection_count(&self) -> usize {
        self.history.lock().len()
    }
}

impl Default for ReflectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() > ADVICE_EXCERPT_CHARS {
        let cut: String = text.chars().take(ADVICE_EXCERPT_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
