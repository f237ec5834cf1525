//! The agent - runs the learning loop.

use crate::config::{AgentConfig, Result};
use crate::{evaluate_result, perceive, ActionSelector, EpsilonGreedySelector};
use evolve_core::{task_type, Context, Experience, Strategy, Value};
use evolve_evolution::{EvolutionOptimizer, EvolutionReport, EvolutionTargets, PerformanceSummary};
use evolve_knowledge::{ConceptGraph, Embedder, GraphConfig};
use evolve_reflection::{Advisor, ReflectionEngine};
use evolve_storage::{AgentSnapshot, ExperienceMemory, PerformanceLog, StrategyTable};
use evolve_tools::{ToolExecutor, ToolRegistry};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Action name used when nothing can be selected.
pub const NO_ACTION: &str = "none";

/// Phase of the per-task cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// Between tasks
    Idle,
    /// Gathering relevant experiences and strategies
    Perceive,
    /// Choosing an action
    Decide,
    /// Running the tool
    Act,
    /// Scoring the result
    Evaluate,
    /// Updating memory, graph, reflection and strategies
    Learn,
}

/// Result of processing one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task description
    pub task: String,
    /// Action taken
    pub action: String,
    /// Tool result
    pub result: Value,
    /// Whether the attempt succeeded
    pub success: bool,
    /// Reward
    pub reward: f64,
    /// Reflection on the attempt
    pub insights: String,
    /// Report of the evolution pass this task triggered, if any
    pub evolution: Option<EvolutionReport>,
}

/// A self-evolving learning agent.
///
/// Runs the loop:
/// ```text
/// Perceive → Decide → Act → Evaluate → Learn → (every N tasks) Evolve
/// ```
/// Tasks are processed one at a time; the stores stay readable while a
/// task runs.
pub struct Agent {
    config: AgentConfig,
    memory: ExperienceMemory,
    strategies: StrategyTable,
    graph: ConceptGraph,
    registry: ToolRegistry,
    reflection: ReflectionEngine,
    performance: PerformanceLog,
    optimizer: EvolutionOptimizer,
    selector: Box<dyn ActionSelector>,
    exploration_rate: RwLock<f64>,
    phase: RwLock<CyclePhase>,
    task_gate: tokio::sync::Mutex<()>,
}

impl Agent {
    /// Create an agent with built-in tools and seeded strategies.
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        info!("Creating agent {}", config.name);

        let tool_seed = config.seed;
        let selector_seed = config.seed.map(|s| s.wrapping_add(1));

        Ok(Self {
            memory: ExperienceMemory::new(config.memory_size),
            strategies: StrategyTable::with_defaults(),
            graph: ConceptGraph::new().with_config(GraphConfig {
                learning_rate: config.learning_rate,
            }),
            registry: ToolRegistry::with_builtins(tool_seed),
            reflection: ReflectionEngine::new().with_config(config.reflection.clone()),
            performance: PerformanceLog::new(),
            optimizer: EvolutionOptimizer::new().with_config(config.evolution.clone()),
            selector: Box::new(EpsilonGreedySelector::new(selector_seed)),
            exploration_rate: RwLock::new(config.exploration_rate),
            phase: RwLock::new(CyclePhase::Idle),
            task_gate: tokio::sync::Mutex::new(()),
            config,
        })
    }

    /// Replace the tool registry.
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the action selector.
    pub fn with_selector(mut self, selector: Box<dyn ActionSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Attach an advisory collaborator to reflection.
    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.reflection = std::mem::take(&mut self.reflection).with_advisor(advisor);
        self
    }

    /// Use a different concept embedder. Call before any task is processed.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.graph = std::mem::take(&mut self.graph).with_embedder(embedder);
        self
    }

    /// Process one task through the full cycle.
    ///
    /// Never fails: tool errors and unknown actions become negative
    /// feedback, advisory failures become fallback text.
    pub async fn process_task(&self, task: &str, context: Option<Context>) -> TaskResult {
        let _gate = self.task_gate.lock().await;
        info!("Processing task: {}", task);

        let mut context = context.unwrap_or_default();
        context.insert("task".into(), task.into());

        self.enter(CyclePhase::Perceive);
        let perception = perceive(&self.memory, &self.strategies, &context);
        debug!(
            "{} relevant experiences, {} strategies, uncertainty {:.2}",
            perception.relevant_experiences.len(),
            perception.applicable_strategies.len(),
            perception.uncertainty
        );

        self.enter(CyclePhase::Decide);
        let available = self.registry.names();
        let action = self
            .selector
            .select(&perception, &available, self.exploration_rate())
            .unwrap_or_else(|| NO_ACTION.to_string());
        debug!("Chose action {}", action);

        self.enter(CyclePhase::Act);
        let result = self.registry.execute_tool(&action, &context).await;

        self.enter(CyclePhase::Evaluate);
        let outcome = evaluate_result(&result);

        self.enter(CyclePhase::Learn);
        let experience = Experience::new(
            task,
            context,
            action.clone(),
            result.clone(),
            outcome.success,
            outcome.reward,
        );
        let insights = self.learn(experience).await;

        let total = self.performance.total_tasks();
        let evolution = if EvolutionOptimizer::is_due(total, self.config.evolution_interval) {
            Some(self.self_evolve().await)
        } else {
            None
        };

        self.enter(CyclePhase::Idle);
        TaskResult {
            task: task.to_string(),
            action,
            result,
            success: outcome.success,
            reward: outcome.reward,
            insights,
            evolution,
        }
    }

    /// Fold an experience into every store. Returns the reflection text.
    async fn learn(&self, experience: Experience) -> String {
        self.memory.push(experience.clone());
        self.update_graph(&experience);

        let reflection = self.reflection.reflect(&experience).await;
        self.memory.attach_reflection(experience.id, &reflection);

        self.update_strategy(&experience);

        let record = self.performance.record(experience.success);
        if let Some(adjustment) = self.optimizer.adjust_exploration(
            self.exploration_rate(),
            self.performance
                .recent_mean(self.optimizer.config().exploration.window),
        ) {
            debug!("Exploration rate -> {:.3}: {}", adjustment.value, adjustment.reason);
            *self.exploration_rate.write() = adjustment.value;
        }

        info!(
            "Learned from task {}: success={}, reward={:.2}, success rate {:.2}",
            experience.task, experience.success, experience.reward, record.success_rate
        );
        reflection
    }

    fn update_graph(&self, experience: &Experience) {
        let task_concept = format!("task:{}", experience.task);
        let action_concept = format!("action:{}", experience.action);

        let mut task_props = Context::new();
        task_props.insert("type".into(), "task".into());
        task_props.insert("description".into(), experience.task.clone().into());
        self.graph.add_concept(&task_concept, task_props);

        let mut action_props = Context::new();
        action_props.insert("type".into(), "action".into());
        action_props.insert("description".into(), experience.action.clone().into());
        self.graph.add_concept(&action_concept, action_props);

        let relation = if experience.success {
            "succeeds_with"
        } else {
            "fails_with"
        };
        self.graph
            .add_relation(&task_concept, &action_concept, relation, experience.reward);
    }

    fn update_strategy(&self, experience: &Experience) {
        let kind = task_type(&experience.task);
        let name = format!("strategy_{}_{}", kind, experience.action);

        self.strategies.record_outcome(
            &name,
            experience.success,
            self.config.learning_rate,
            || {
                let mut conditions = Context::new();
                conditions.insert("task_type".into(), kind.into());
                Strategy::new(
                    name.clone(),
                    format!("{} strategy for {} tasks", experience.action, kind),
                    conditions,
                    vec![experience.action.clone()],
                    if experience.success { 1.0 } else { 0.0 },
                    1,
                )
            },
        );
    }

    /// Run an evolution pass now.
    pub async fn self_evolve(&self) -> EvolutionReport {
        self.optimizer
            .evolve(EvolutionTargets {
                memory: &self.memory,
                strategies: &self.strategies,
                graph: &self.graph,
                registry: &self.registry,
                reflection: &self.reflection,
            })
            .await
    }

    /// Overall performance figures.
    pub fn performance_summary(&self) -> PerformanceSummary {
        PerformanceSummary {
            total_tasks: self.performance.total_tasks(),
            successful_tasks: self.performance.successful_tasks(),
            current_success_rate: self
                .performance
                .latest()
                .map(|r| r.success_rate)
                .unwrap_or(0.0),
            trend: self
                .performance
                .trend(self.optimizer.config().exploration.window),
            strategies_count: self.strategies.len(),
            experiences_count: self.memory.len(),
            exploration_rate: self.exploration_rate(),
            knowledge_concepts: self.graph.len(),
        }
    }

    /// Capture experiences and strategies.
    pub fn export_snapshot(&self) -> AgentSnapshot {
        AgentSnapshot::capture(&self.memory, &self.strategies)
    }

    /// Load experiences and strategies from a snapshot.
    ///
    /// Returns the number of experiences and strategies restored.
    pub fn restore_snapshot(&self, snapshot: &AgentSnapshot) -> evolve_storage::Result<(usize, usize)> {
        let counts = snapshot.restore(&self.memory, &self.strategies)?;
        info!("Restored {} experiences and {} strategies", counts.0, counts.1);
        Ok(counts)
    }

    /// Save a snapshot file.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> evolve_storage::Result<()> {
        self.export_snapshot().save(path).await
    }

    /// Restore from a snapshot file.
    pub async fn load_snapshot(&self, path: impl AsRef<Path>) -> evolve_storage::Result<(usize, usize)> {
        let snapshot = AgentSnapshot::load(path).await?;
        self.restore_snapshot(&snapshot)
    }

    fn enter(&self, phase: CyclePhase) {
        debug!("Phase {:?}", phase);
        *self.phase.write() = phase;
    }

    /// Agent name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configuration in use.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Current phase.
    pub fn phase(&self) -> CyclePhase {
        *self.phase.read()
    }

    /// Current exploration rate.
    pub fn exploration_rate(&self) -> f64 {
        *self.exploration_rate.read()
    }

    /// Experience memory.
    pub fn memory(&self) -> &ExperienceMemory {
        &self.memory
    }

    /// Strategy table.
    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    /// Concept graph.
    pub fn graph(&self) -> &ConceptGraph {
        &self.graph
    }

    /// Tool registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Reflection engine.
    pub fn reflection(&self) -> &ReflectionEngine {
        &self.reflection
    }

    /// Performance log.
    pub fn performance(&self) -> &PerformanceLog {
        &self.performance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedSelector;
    use async_trait::async_trait;
    use evolve_core::{context, Trend};
    use evolve_tools::Tool;

    /// Tool with a fixed structured result.
    struct FixedTool {
        name: &'static str,
        success: bool,
    }

    #[async_trait]
    impl Tool for FixedTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Returns a fixed outcome"
        }

        async fn execute(&self, _context: &Context) -> std::result::Result<Value, anyhow::Error> {
            Ok(context! { "success" => self.success }.into())
        }
    }

    fn registry(tools: &[(&'static str, bool)]) -> ToolRegistry {
        let registry = ToolRegistry::new();
        for &(name, success) in tools {
            registry.register(Arc::new(FixedTool { name, success }));
        }
        registry
    }

    fn seeded(config: AgentConfig) -> Agent {
        Agent::new(AgentConfig {
            seed: Some(7),
            ..config
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_cold_start() {
        let agent = seeded(AgentConfig::default());
        let result = agent.process_task("search: X", None).await;

        assert!(agent.graph().contains("task:search: X"));
        assert!(agent.graph().contains(&format!("action:{}", result.action)));
        assert_eq!(agent.memory().len(), 1);
        assert_eq!(agent.performance().len(), 1);
        assert_eq!(agent.performance().latest().unwrap().total_tasks, 1);
        assert!(!result.insights.is_empty());
        assert_eq!(agent.phase(), CyclePhase::Idle);

        let stored = &agent.memory().all()[0];
        assert_eq!(stored.reflection.as_deref(), Some(result.insights.as_str()));
        assert_eq!(stored.context.get("task"), Some(&Value::from("search: X")));
        assert!(agent
            .strategies()
            .contains(&format!("strategy_search_{}", result.action)));
    }

    #[tokio::test]
    async fn test_unknown_action_is_negative_feedback() {
        let agent = seeded(AgentConfig::default())
            .with_registry(ToolRegistry::new())
            .with_selector(Box::new(ScriptedSelector::new(["teleport"])));
        let result = agent.process_task("move: home", None).await;

        assert!(!result.success);
        assert_eq!(result.reward, -1.0);
        assert_eq!(
            result.result.get("error").and_then(Value::as_str),
            Some("unknown action: teleport")
        );
        let edge = agent
            .graph()
            .relation("task:move: home", "action:teleport", "fails_with")
            .unwrap();
        assert_eq!(edge.weight, -1.0);
    }

    #[tokio::test]
    async fn test_strategy_learning_uses_ema() {
        let agent = seeded(AgentConfig::default())
            .with_registry(registry(&[("a", true), ("b", false)]))
            .with_selector(Box::new(ScriptedSelector::new(["a", "b", "b"])));

        agent.process_task("job: 1", None).await;
        agent.process_task("job: 2", None).await;
        agent.process_task("job: 3", None).await;

        let a = agent.strategies().get("strategy_job_a").unwrap();
        assert_eq!((a.success_rate, a.usage_count), (1.0, 1));
        let b = agent.strategies().get("strategy_job_b").unwrap();
        assert_eq!(b.usage_count, 2);
        assert_eq!(b.success_rate, 0.0);
        assert_eq!(b.conditions.get("task_type"), Some(&Value::from("job")));
    }

    #[tokio::test]
    async fn test_memory_bound() {
        let agent = seeded(AgentConfig {
            memory_size: 5,
            ..Default::default()
        })
        .with_registry(registry(&[("a", true)]));

        for i in 0..8 {
            agent.process_task(&format!("job: {}", i), None).await;
        }
        let kept: Vec<String> = agent.memory().all().into_iter().map(|e| e.task).collect();
        assert_eq!(kept, vec!["job: 3", "job: 4", "job: 5", "job: 6", "job: 7"]);
        assert_eq!(agent.performance_summary().total_tasks, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stores_readable_while_tasks_run() {
        let agent = Arc::new(
            seeded(AgentConfig {
                memory_size: 20,
                evolution_interval: 10,
                ..Default::default()
            })
            .with_registry(registry(&[("a", true), ("b", false)])),
        );

        let writer = {
            let agent = Arc::clone(&agent);
            tokio::spawn(async move {
                for i in 0..60 {
                    agent.process_task(&format!("job: {}", i % 4), None).await;
                }
            })
        };

        let mut last_total = 0;
        let mut last_concepts = 0;
        let mut reads = 0;
        while !writer.is_finished() {
            assert!(agent.memory().all().len() <= 20);
            let _ = agent.strategies().snapshot();
            let concepts = agent.graph().statistics().concept_count;
            assert!(concepts >= last_concepts);
            last_concepts = concepts;
            let summary = agent.performance_summary();
            assert!(summary.total_tasks >= last_total);
            last_total = summary.total_tasks;
            reads += 1;
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        assert!(reads > 0);
        assert_eq!(agent.memory().len(), 20);
        assert_eq!(agent.performance_summary().total_tasks, 60);
    }

    #[tokio::test]
    async fn test_exploration_rises_after_failures() {
        let agent = seeded(AgentConfig::default()).with_registry(registry(&[("a", false)]));
        let initial = agent.exploration_rate();

        for i in 0..10 {
            let result = agent.process_task(&format!("job: {}", i), None).await;
            assert!(!result.success);
        }
        let raised = agent.exploration_rate();
        assert!(raised > initial);

        for i in 10..40 {
            agent.process_task(&format!("job: {}", i), None).await;
        }
        assert_eq!(agent.exploration_rate(), 0.5);
    }

    #[tokio::test]
    async fn test_exploration_falls_after_successes() {
        let agent = seeded(AgentConfig::default()).with_registry(registry(&[("a", true)]));
        for i in 0..10 {
            agent.process_task(&format!("job: {}", i), None).await;
        }
        assert!((agent.exploration_rate() - 0.18).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_pruning_on_evolution() {
        let agent = seeded(AgentConfig::default());
        agent.strategies().upsert(Strategy::new(
            "stale",
            "",
            context! { "never" => "matches" },
            vec!["search".into()],
            0.2,
            11,
        ));
        assert!(agent.strategies().contains("stale"));

        let report = agent.self_evolve().await;
        assert_eq!(report.pruned_strategies, vec!["stale"]);
        assert!(!agent.strategies().contains("stale"));
    }

    #[tokio::test]
    async fn test_combo_synthesis() {
        let agent = seeded(AgentConfig::default())
            .with_registry(registry(&[("A", true), ("B", true)]))
            .with_selector(Box::new(ScriptedSelector::new(["A", "B", "A", "B", "A", "B"])));

        for i in 0..6 {
            agent.process_task(&format!("step: {}", i), None).await;
        }
        assert!(!agent.registry().contains("combo_A_B"));

        let report = agent.self_evolve().await;
        assert_eq!(report.new_tools, vec!["combo_A_B"]);
        assert!(agent.registry().contains("combo_A_B"));

        let combo = agent.registry().execute_tool("combo_A_B", &Context::new()).await;
        assert_eq!(combo.get("combo_success"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_evolution_runs_on_interval() {
        let agent = seeded(AgentConfig {
            evolution_interval: 3,
            ..Default::default()
        })
        .with_registry(registry(&[("a", true)]));

        let mut reports = 0;
        for i in 0..6 {
            if agent.process_task(&format!("job: {}", i), None).await.evolution.is_some() {
                reports += 1;
            }
        }
        assert_eq!(reports, 2);
    }

    #[tokio::test]
    async fn test_performance_summary() {
        let agent = seeded(AgentConfig::default()).with_registry(registry(&[("a", true)]));
        let empty = agent.performance_summary();
        assert_eq!(empty.total_tasks, 0);
        assert_eq!(empty.trend, Trend::InsufficientData);

        agent.process_task("job: 1", None).await;
        let summary = agent.performance_summary();
        assert_eq!(summary.successful_tasks, 1);
        assert_eq!(summary.current_success_rate, 1.0);
        assert_eq!(summary.experiences_count, 1);
        assert_eq!(summary.knowledge_concepts, 2);
        // explore, exploit and the learned strategy
        assert_eq!(summary.strategies_count, 3);
    }

    #[tokio::test]
    async fn test_seeded_runs_are_reproducible() {
        let run = || async {
            let agent = seeded(AgentConfig::default());
            let mut actions = Vec::new();
            for task in ["search: rust", "calculate: 2 * 3", "plan: trip", "analyze: logs"] {
                actions.push(agent.process_task(task, None).await.action);
            }
            actions
        };
        assert_eq!(run().await, run().await);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");

        let agent = seeded(AgentConfig::default()).with_registry(registry(&[("a", true)]));
        agent.process_task("job: 1", None).await;
        agent.save_snapshot(&path).await.unwrap();

        let fresh = seeded(AgentConfig::default());
        let (experiences, strategies) = fresh.load_snapshot(&path).await.unwrap();
        assert_eq!(experiences, 1);
        assert_eq!(strategies, 3);
        assert!(fresh.strategies().contains("strategy_job_a"));
        assert_eq!(fresh.memory().all()[0].task, "job: 1");
    }
}
