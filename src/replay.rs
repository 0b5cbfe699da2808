//! Token replay of student traces against the reference process model. The
//! algorithm sits behind the `ReplayOracle` trait; everything downstream
//! consumes `ReplayDiagnostic`s and never looks inside the replayer.

use std::collections::BTreeMap;

use crate::models::EventLogEntry;
use crate::petri::ProcessModel;

/// One student's chronologically ordered activity sequence.
#[derive(Debug, Clone)]
pub struct Trace {
    pub student: String,
    pub activities: Vec<String>,
}

/// Group a (student, timestamp)-sorted event subset into per-student traces.
pub fn traces_from(events: &[&EventLogEntry]) -> Vec<Trace> {
    let mut traces: Vec<Trace> = Vec::new();
    for event in events {
        match traces.last_mut() {
            Some(trace) if trace.student == event.student => {
                trace.activities.push(event.activity.clone());
            }
            _ => traces.push(Trace {
                student: event.student.clone(),
                activities: vec![event.activity.clone()],
            }),
        }
    }
    traces
}

/// Replay outcome for one trace.
#[derive(Debug, Clone, Default)]
pub struct ReplayDiagnostic {
    pub student: String,
    /// Token-based fitness in [0, 1].
    pub fitness: f64,
    pub missing_tokens: u64,
    pub consumed_tokens: u64,
    pub remaining_tokens: u64,
    pub produced_tokens: u64,
    /// Labels of the transitions fired during replay.
    pub activated_transitions: Vec<String>,
    /// Leftover tokens per place when the trace ended, before the final
    /// marking was consumed.
    pub reached_marking: BTreeMap<String, u64>,
}

impl ReplayDiagnostic {
    /// Whether the graduation transition fired during replay.
    pub fn reached_graduation(&self) -> bool {
        self.activated_transitions
            .iter()
            .any(|label| label == crate::catalog::GRADUATION_ACTIVITY)
    }
}

/// Boundary contract for the conformance-checking algorithm.
pub trait ReplayOracle {
    fn replay(&self, traces: &[Trace], model: &ProcessModel) -> Vec<ReplayDiagnostic>;
}

/// Default token replayer: produce the initial marking, fire the transition
/// matching each activity label (inserting missing tokens where inputs are
/// unavailable), then consume the final marking. Activities without a
/// matching transition are skipped.
pub struct TokenReplayer;

impl ReplayOracle for TokenReplayer {
    fn replay(&self, traces: &[Trace], model: &ProcessModel) -> Vec<ReplayDiagnostic> {
        traces
            .iter()
            .map(|trace| replay_trace(trace, model))
            .collect()
    }
}

fn replay_trace(trace: &Trace, model: &ProcessModel) -> ReplayDiagnostic {
    let mut marking: BTreeMap<String, u64> = model.initial_marking.clone();
    let mut produced: u64 = model.initial_marking.values().sum();
    let mut consumed: u64 = 0;
    let mut missing: u64 = 0;
    let mut activated: Vec<String> = Vec::new();

    for activity in &trace.activities {
        let Some(transition) = model.transition_by_label(activity) else {
            continue;
        };
        for place in model.input_places(&transition.id) {
            let tokens = marking.entry(place.to_string()).or_insert(0);
            if *tokens > 0 {
                *tokens -= 1;
            } else {
                missing += 1;
            }
            consumed += 1;
        }
        for place in model.output_places(&transition.id) {
            *marking.entry(place.to_string()).or_insert(0) += 1;
            produced += 1;
        }
        if let Some(label) = &transition.label {
            activated.push(label.clone());
        }
    }

    let reached_marking: BTreeMap<String, u64> =
        marking.iter().filter(|(_, &n)| n > 0).map(|(p, &n)| (p.clone(), n)).collect();

    // Close out against the final marking.
    for (place, &needed) in &model.final_marking {
        let available = marking.get(place).copied().unwrap_or(0);
        missing += needed.saturating_sub(available);
        consumed += needed;
        marking.insert(place.clone(), available.saturating_sub(needed));
    }
    let remaining: u64 = marking.values().sum();

    let fitness = token_fitness(missing, consumed, remaining, produced);

    ReplayDiagnostic {
        student: trace.student.clone(),
        fitness,
        missing_tokens: missing,
        consumed_tokens: consumed,
        remaining_tokens: remaining,
        produced_tokens: produced,
        activated_transitions: activated,
        reached_marking,
    }
}

/// Standard token-based fitness: ½(1 − m/c) + ½(1 − r/p), clamped to [0, 1].
fn token_fitness(missing: u64, consumed: u64, remaining: u64, produced: u64) -> f64 {
    let consumed_part = if consumed == 0 {
        1.0
    } else {
        1.0 - missing as f64 / consumed as f64
    };
    let produced_part = if produced == 0 {
        1.0
    } else {
        1.0 - remaining as f64 / produced as f64
    };
    (0.5 * consumed_part + 0.5 * produced_part).clamp(0.0, 1.0)
}
