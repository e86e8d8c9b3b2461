//! End-to-end tick cycle tests: config to runner to published events.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]

use tokio::sync::mpsc;
use worldsim_core::{
    CrowdModel, MemorySink, RunnerInput, Subsystem, TickRunner, WorldCommand, WorldSimConfig,
    WorldSimulation,
};
use worldsim_crowd::SummarySignal;
use worldsim_diplomacy::{DiplomacyEngine, NoNoise, NoiseSource};
use worldsim_types::{
    DiplomaticEventKind, DiplomaticState, EventPayload, FactionId, OutboundEvent, TickId,
    TickTrigger,
};

const CONFIG: &str = r#"
world:
  seed: 7

crowd:
  enabled: true
  grid_width: 40
  grid_height: 40
  initial_agents: 120

diplomacy:
  noise_amplitude: 0.0
  factions:
    - id: "north"
      name: "Northern League"
      military_power: 5.0
    - id: "south"
      military_power: 5.0
    - id: "east"
      military_power: 5.0

orchestrator:
  parallel_subsystems: true
  tick_queue_capacity: 8
  max_pending_events: 100
"#;

fn id(s: &str) -> FactionId {
    FactionId::new(s)
}

fn tick(n: u64) -> RunnerInput {
    RunnerInput::Tick(TickTrigger::now(TickId::from(n)))
}

fn events_for(events: &[OutboundEvent], n: u64) -> Vec<&OutboundEvent> {
    events
        .iter()
        .filter(|e| e.tick_id == TickId::from(n))
        .collect()
}

async fn run_inputs(world: WorldSimulation, inputs: Vec<RunnerInput>) -> TickRunner<MemorySink> {
    let (tx, rx) = mpsc::channel(inputs.len().max(1));
    for input in inputs {
        tx.send(input).await.unwrap();
    }
    drop(tx);
    TickRunner::new(world, MemorySink::new(), 100)
        .run(rx, std::future::pending())
        .await
}

#[tokio::test]
async fn configured_world_publishes_ordered_batches() {
    let config = WorldSimConfig::parse(CONFIG).unwrap();
    config.validate().unwrap();
    let world = WorldSimulation::from_config(&config).unwrap();
    assert_eq!(world.diplomacy.faction_count(), 3);
    assert_eq!(
        world.diplomacy.faction(&id("north")).unwrap().name,
        "Northern League"
    );
    assert_eq!(world.diplomacy.faction(&id("south")).unwrap().name, "south");

    let runner = run_inputs(world, (1..=3).map(tick).collect()).await;
    let published = &runner.sink().published;
    assert_eq!(runner.stats().ticks, 3);
    assert!(runner.pending().is_empty());

    for n in 1..=3 {
        let batch = events_for(published, n);
        assert!(!batch.is_empty());
        assert_eq!(batch[0].event_type(), "diplomacy_evaluation");

        let first_crowd = batch
            .iter()
            .position(|e| !e.event_type().starts_with("diplomacy_"))
            .unwrap_or(batch.len());
        assert!(
            batch[first_crowd..]
                .iter()
                .all(|e| !e.event_type().starts_with("diplomacy_"))
        );
    }

    // 120 agents walking 60% of the time move far more than ten times a step.
    assert!(published.iter().any(|e| e.event_type() == "crowd_signal"));
    let steps: Vec<u64> = published
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::CrowdSignal { step, .. } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(steps, vec![1, 2, 3]);
}

#[tokio::test]
async fn power_asymmetry_builds_fear_without_war() {
    let mut diplomacy = DiplomacyEngine::with_noise(Box::new(NoNoise));
    diplomacy.register_faction(id("a"), 9.0, "Strong").unwrap();
    diplomacy.register_faction(id("b"), 3.0, "Weak").unwrap();
    let world = WorldSimulation::new(diplomacy, None, false);

    let runner = run_inputs(world, (1..=5).map(tick).collect()).await;
    let relation = runner.world().diplomacy.relation(&id("a"), &id("b")).unwrap();
    // Total power 3.65 vs 1.25: ratio 2.92, fear factor (2.92 - 1) * 0.3.
    let fear_factor = worldsim_diplomacy::fear_factor(3.65, 1.25);
    assert!((fear_factor - 0.576).abs() < 1e-9);
    assert!((relation.fear() - 5.0 * 0.0576).abs() < 1e-9);
    assert_eq!(relation.state(), DiplomaticState::Peace);
    assert_eq!(runner.sink().published.len(), 5);
}

#[tokio::test]
async fn betrayal_command_ends_an_alliance() {
    let mut diplomacy = DiplomacyEngine::with_noise(Box::new(NoNoise));
    diplomacy.register_faction(id("a"), 1.0, "").unwrap();
    diplomacy.register_faction(id("b"), 1.0, "").unwrap();
    diplomacy
        .relation_mut(&id("a"), &id("b"))
        .unwrap()
        .update_scores(0.6, 0.0, 0.5);
    let world = WorldSimulation::new(diplomacy, None, true);

    let betrayal: WorldCommand = serde_json::from_str(
        r#"{"command":"diplomatic_event","kind":"betrayal","factions":["a","b"]}"#,
    )
    .unwrap();
    let runner = run_inputs(
        world,
        vec![tick(1), RunnerInput::Command(betrayal), tick(2)],
    )
    .await;

    let published = &runner.sink().published;
    let first = events_for(published, 1);
    assert!(first.iter().any(|e| matches!(
        e.payload,
        EventPayload::DiplomacyStateChange {
            new_state: DiplomaticState::Alliance,
            ..
        }
    )));

    let second = events_for(published, 2);
    let EventPayload::DiplomacyEvaluation { results, .. } = &second[0].payload else {
        panic!("expected evaluation first, got {:?}", second[0].payload);
    };
    assert_eq!(results.get("a_b"), Some(&DiplomaticState::ColdWar));
    assert_eq!(runner.stats().commands_applied, 1);
    assert_eq!(
        runner.world().diplomacy.event_log()[0].kind,
        DiplomaticEventKind::Betrayal
    );
}

struct ExplodingNoise;

impl NoiseSource for ExplodingNoise {
    fn sample(&mut self) -> f64 {
        panic!("noise source exploded");
    }
}

#[tokio::test]
async fn diplomacy_panic_does_not_block_crowd_events() {
    for parallel in [true, false] {
        let mut config = WorldSimConfig::parse(CONFIG).unwrap();
        config.orchestrator.parallel_subsystems = parallel;
        let mut world = WorldSimulation::from_config(&config).unwrap();
        world.diplomacy.set_noise(Box::new(ExplodingNoise));

        let trigger = TickTrigger::now(TickId::Text("boom".to_owned()));
        let report = world.run_tick(&trigger);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subsystem, Subsystem::Diplomacy);
        assert!(report.failures[0].error.to_string().contains("noise source exploded"));
        assert!(!report.events.is_empty());
        assert!(
            report
                .events
                .iter()
                .all(|e| !e.event_type().starts_with("diplomacy_"))
        );
    }
}

#[derive(Debug)]
struct ExplodingCrowd;

impl CrowdModel for ExplodingCrowd {
    fn step(&mut self) -> Vec<SummarySignal> {
        panic!("crowd model exploded");
    }

    fn step_count(&self) -> u64 {
        0
    }

    fn population(&self) -> usize {
        0
    }
}

#[tokio::test]
async fn crowd_panic_does_not_block_diplomacy_events() {
    for parallel in [true, false] {
        let mut config = WorldSimConfig::parse(CONFIG).unwrap();
        config.orchestrator.parallel_subsystems = parallel;
        let mut world = WorldSimulation::from_config(&config).unwrap();
        world.crowd = Some(Box::new(ExplodingCrowd));

        let runner = run_inputs(world, vec![tick(1)]).await;
        let published = &runner.sink().published;
        assert_eq!(published[0].event_type(), "diplomacy_evaluation");
        assert!(
            published
                .iter()
                .all(|e| e.event_type().starts_with("diplomacy_"))
        );
        assert_eq!(runner.stats().ticks, 1);
    }

    let config = WorldSimConfig::parse(CONFIG).unwrap();
    let mut world = WorldSimulation::from_config(&config).unwrap();
    world.crowd = Some(Box::new(ExplodingCrowd));
    let report = world.run_tick(&TickTrigger::now(TickId::from(2)));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].subsystem, Subsystem::Crowd);
    assert!(report.failures[0].error.to_string().contains("crowd model exploded"));
}

#[tokio::test]
async fn shutdown_is_observed_between_ticks() {
    let config = WorldSimConfig::parse(CONFIG).unwrap();
    let world = WorldSimulation::from_config(&config).unwrap();

    let (tx, rx) = mpsc::channel(4);
    tx.send(tick(1)).await.unwrap();
    let runner = TickRunner::new(world, MemorySink::new(), 10)
        .run(rx, std::future::ready(()))
        .await;

    assert_eq!(runner.stats().ticks, 0);
    assert!(runner.sink().published.is_empty());
}
