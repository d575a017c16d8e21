//! Behavioral tests for `PipelineOrchestrator` runs, stage failures and hooks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use sigscope_pipeline::{
    hook_future, logging_hooks, timing_hooks, PipelineContext, PipelineHooks,
    PipelineOrchestrator, PipelineStage, StageError, STAGE_TIMINGS_KEY, TOTAL_DURATION_KEY,
};

/// Integer stage applying `op` to its input.
struct MathStage {
    name: &'static str,
    op: fn(i64) -> i64,
}

#[async_trait]
impl PipelineStage for MathStage {
    type Input = i64;
    type Output = i64;

    fn name(&self) -> &str {
        self.name
    }

    async fn execute(&self, input: i64, ctx: &mut PipelineContext) -> anyhow::Result<i64> {
        let output = (self.op)(input);
        ctx.metadata
            .insert(format!("{}_output", self.name), serde_json::json!(output));
        Ok(output)
    }
}

fn double() -> MathStage {
    MathStage {
        name: "double",
        op: |x| x * 2,
    }
}

fn add_three() -> MathStage {
    MathStage {
        name: "add-three",
        op: |x| x + 3,
    }
}

fn square() -> MathStage {
    MathStage {
        name: "square",
        op: |x| x * x,
    }
}

/// Fails every call and counts how often its own cleanup ran.
struct Exploding {
    cleanups: Arc<AtomicUsize>,
}

#[async_trait]
impl PipelineStage for Exploding {
    type Input = i64;
    type Output = i64;

    fn name(&self) -> &str {
        "explode"
    }

    async fn execute(&self, _input: i64, _ctx: &mut PipelineContext) -> anyhow::Result<i64> {
        Err(anyhow!("llm quota exhausted"))
    }

    async fn on_error(&self, _error: &anyhow::Error, ctx: &mut PipelineContext) {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        ctx.metadata
            .insert("cleaned_up".to_string(), serde_json::json!(true));
    }
}

/// Succeeds but only accepts non-negative output.
struct NonNegative;

#[async_trait]
impl PipelineStage for NonNegative {
    type Input = i64;
    type Output = i64;

    fn name(&self) -> &str {
        "negate"
    }

    async fn execute(&self, input: i64, _ctx: &mut PipelineContext) -> anyhow::Result<i64> {
        Ok(-input)
    }

    fn validate(&self, output: &i64) -> bool {
        *output >= 0
    }
}

type Events = Arc<Mutex<Vec<String>>>;

fn recording_hooks(events: &Events) -> PipelineHooks {
    let on_start = Arc::clone(events);
    let on_stage_start = Arc::clone(events);
    let on_stage_complete = Arc::clone(events);
    let on_stage_error = Arc::clone(events);
    let on_complete = Arc::clone(events);
    let on_error = Arc::clone(events);

    PipelineHooks::new()
        .on_start(move |_ctx| {
            let events = Arc::clone(&on_start);
            hook_future(async move {
                events.lock().unwrap().push("start".to_string());
                Ok(())
            })
        })
        .on_stage_start(move |stage, _ctx| {
            let events = Arc::clone(&on_stage_start);
            hook_future(async move {
                events.lock().unwrap().push(format!("stage_start:{stage}"));
                Ok(())
            })
        })
        .on_stage_complete(move |stage, output, _ctx| {
            let events = Arc::clone(&on_stage_complete);
            hook_future(async move {
                let value = output.downcast_ref::<i64>().copied().unwrap_or(i64::MIN);
                events
                    .lock()
                    .unwrap()
                    .push(format!("stage_complete:{stage}={value}"));
                Ok(())
            })
        })
        .on_stage_error(move |stage, _error, _ctx| {
            let events = Arc::clone(&on_stage_error);
            hook_future(async move {
                events.lock().unwrap().push(format!("stage_error:{stage}"));
                Ok(())
            })
        })
        .on_complete(move |summary, _ctx| {
            let events = Arc::clone(&on_complete);
            hook_future(async move {
                events
                    .lock()
                    .unwrap()
                    .push(format!("complete:{}", summary.success));
                Ok(())
            })
        })
        .on_error(move |stage, _error, _ctx| {
            let events = Arc::clone(&on_error);
            hook_future(async move {
                events.lock().unwrap().push(format!("error:{stage}"));
                Ok(())
            })
        })
}

fn count(events: &Events, prefix: &str) -> usize {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .count()
}

#[tokio::test]
async fn zero_stages_return_the_input() {
    let result = PipelineOrchestrator::new().run(42_i64).await.unwrap();
    assert_eq!(result.output, 42);
    assert!(result.success);
    assert!(result.context.errors().is_empty());
}

#[tokio::test]
async fn double_stage_doubles() {
    let result = PipelineOrchestrator::new()
        .add_stage(double())
        .run(5)
        .await
        .unwrap();
    assert_eq!(result.output, 10);
    assert!(result.success);
}

#[tokio::test]
async fn stages_compose_in_order() {
    let orchestrator = PipelineOrchestrator::new()
        .add_stage(add_three())
        .add_stage(double())
        .add_stage(square());
    let result = orchestrator.run(2).await.unwrap();
    // square(double(add_three(2)))
    assert_eq!(result.output, 100);
    assert_eq!(result.context.metadata["add-three_output"], 5);
    assert_eq!(result.context.metadata["double_output"], 10);
}

#[tokio::test]
async fn orchestrator_can_run_repeatedly_with_fresh_contexts() {
    let orchestrator = PipelineOrchestrator::new().add_stage(double());
    let first = orchestrator.run(1).await.unwrap();
    let second = orchestrator.run(2).await.unwrap();
    assert_eq!(second.output, 4);
    assert_ne!(first.context.run_id, second.context.run_id);
}

#[tokio::test]
async fn failing_stage_produces_pipeline_error() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    let events: Events = Arc::default();
    let orchestrator = PipelineOrchestrator::new()
        .add_stage(double())
        .add_stage(Exploding {
            cleanups: Arc::clone(&cleanups),
        })
        .add_stage(square())
        .add_hooks(recording_hooks(&events));

    let err = orchestrator.run(5).await.unwrap_err();

    assert_eq!(err.stage, "explode");
    assert!(err.message.contains("llm quota exhausted"));
    assert_eq!(err.cause.to_string(), "llm quota exhausted");
    assert_eq!(err.context.errors().len(), 1);
    assert_eq!(err.context.errors()[0].stage, "explode");
    // Partial results survive on the error's context.
    assert_eq!(err.context.metadata["double_output"], 10);
    assert_eq!(err.context.metadata["cleaned_up"], true);
    assert!(!err.context.metadata.contains_key("square_output"));
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);

    let events = events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start",
            "stage_start:double",
            "stage_complete:double=10",
            "stage_start:explode",
            "stage_error:explode",
            "error:explode",
            "complete:false",
        ]
    );
}

#[tokio::test]
async fn rejected_output_is_a_failure() {
    let err = PipelineOrchestrator::new()
        .add_stage(NonNegative)
        .run(3)
        .await
        .unwrap_err();
    assert_eq!(err.stage, "negate");
    assert_eq!(
        err.cause.downcast_ref::<StageError>(),
        Some(&StageError::InvalidOutput("negate".to_string()))
    );
    assert_eq!(err.context.errors().len(), 1);

    let ok = PipelineOrchestrator::new()
        .add_stage(NonNegative)
        .run(-3)
        .await
        .unwrap();
    assert_eq!(ok.output, 3);
}

#[tokio::test]
async fn on_complete_fires_once_per_run() {
    let events: Events = Arc::default();

    let ok = PipelineOrchestrator::new()
        .add_stage(double())
        .add_hooks(recording_hooks(&events));
    ok.run(1).await.unwrap();
    assert_eq!(count(&events, "complete:true"), 1);
    assert_eq!(count(&events, "error:"), 0);

    let failing = PipelineOrchestrator::new()
        .add_stage(Exploding {
            cleanups: Arc::default(),
        })
        .add_hooks(recording_hooks(&events));
    failing.run(1).await.unwrap_err();
    assert_eq!(count(&events, "complete:"), 2);
    assert_eq!(count(&events, "complete:false"), 1);
}

#[tokio::test]
async fn failing_hook_does_not_affect_the_run() {
    let events: Events = Arc::default();
    let broken = PipelineHooks::new()
        .on_start(|_ctx| hook_future(async { Err(anyhow!("metrics backend down")) }))
        .on_stage_complete(|_stage, _output, _ctx| {
            hook_future(async { Err(anyhow!("metrics backend down")) })
        });

    let orchestrator = PipelineOrchestrator::new()
        .add_stage(double())
        .add_hooks(broken)
        .add_hooks(recording_hooks(&events));
    let result = orchestrator.run(4).await.unwrap();

    assert_eq!(result.output, 8);
    assert!(result.context.errors().is_empty());
    assert_eq!(count(&events, "start"), 1);
    assert_eq!(count(&events, "stage_complete:double"), 1);
}

#[tokio::test]
async fn panicking_hook_does_not_stop_the_run() {
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completions);
    let panicking = PipelineHooks::new()
        .on_start(|_ctx| hook_future(async { panic!("observer bug") }))
        .on_stage_start(|_stage, _ctx| {
            hook_future(async {
                let parsed: Result<i64, _> = "not a number".parse::<i64>();
                parsed.unwrap();
                Ok(())
            })
        });
    let counting = PipelineHooks::new().on_complete(move |summary, _ctx| {
        let counter = Arc::clone(&counter);
        let success = summary.success;
        hook_future(async move {
            assert!(success);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });

    let orchestrator = PipelineOrchestrator::new()
        .add_stage(double())
        .add_stage(add_three())
        .add_hooks(panicking)
        .add_hooks(counting);
    let result = tokio::spawn(async move { orchestrator.run(5).await })
        .await
        .expect("run task should not panic")
        .unwrap();

    assert_eq!(result.output, 13);
    assert!(result.context.errors().is_empty());
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn clear_hooks_drops_all_observers() {
    let events: Events = Arc::default();
    let orchestrator = PipelineOrchestrator::new()
        .add_stage(double())
        .add_hooks(recording_hooks(&events))
        .clear_hooks();
    assert!(orchestrator.hooks().is_empty());
    orchestrator.run(1).await.unwrap();
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn built_in_hooks_compose() {
    let orchestrator = PipelineOrchestrator::new()
        .add_stage(double())
        .add_stage(add_three())
        .add_hooks(logging_hooks())
        .add_hooks(timing_hooks());
    let result = orchestrator.run(1).await.unwrap();

    let timings = result.context.metadata[STAGE_TIMINGS_KEY]
        .as_object()
        .unwrap();
    assert_eq!(timings.len(), 2);
    assert!(result.context.metadata[TOTAL_DURATION_KEY].is_u64());
}
