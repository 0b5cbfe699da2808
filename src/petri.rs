//! Reference process model: a Petri-net-like graph (places, transitions,
//! arcs, initial/final marking) loaded once at startup from a JSON file and
//! treated as read-only for the life of the process.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transition {
    pub id: String,
    /// Activity label fired by this transition; silent transitions carry none.
    pub label: Option<String>,
}

/// A directed arc between a place and a transition (either direction),
/// referenced by node id.
#[derive(Debug, Clone, Deserialize)]
pub struct Arc {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessModel {
    pub places: Vec<Place>,
    pub transitions: Vec<Transition>,
    pub arcs: Vec<Arc>,
    #[serde(default)]
    pub initial_marking: BTreeMap<String, u64>,
    #[serde(default)]
    pub final_marking: BTreeMap<String, u64>,
}

impl ProcessModel {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read process model {}", path.display()))?;
        let model: Self = serde_json::from_str(&raw)
            .with_context(|| format!("malformed process model {}", path.display()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for arc in &self.arcs {
            anyhow::ensure!(
                self.is_node(&arc.source) && self.is_node(&arc.target),
                "arc {} -> {} references an unknown node",
                arc.source,
                arc.target
            );
        }
        for place in self.initial_marking.keys().chain(self.final_marking.keys()) {
            anyhow::ensure!(
                self.places.iter().any(|p| &p.id == place),
                "marking references unknown place {place}"
            );
        }
        Ok(())
    }

    fn is_node(&self, id: &str) -> bool {
        self.places.iter().any(|p| p.id == id) || self.transitions.iter().any(|t| t.id == id)
    }

    /// The transition carrying `label`, if any.
    pub fn transition_by_label(&self, label: &str) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.label.as_deref() == Some(label))
    }

    pub fn transition_label(&self, id: &str) -> Option<&str> {
        self.transitions
            .iter()
            .find(|t| t.id == id)
            .and_then(|t| t.label.as_deref())
    }

    /// Places feeding tokens into a transition.
    pub fn input_places(&self, transition: &str) -> Vec<&str> {
        self.arcs
            .iter()
            .filter(|a| a.target == transition)
            .map(|a| a.source.as_str())
            .collect()
    }

    /// Places receiving tokens from a transition.
    pub fn output_places(&self, transition: &str) -> Vec<&str> {
        self.arcs
            .iter()
            .filter(|a| a.source == transition)
            .map(|a| a.target.as_str())
            .collect()
    }

    /// Labels of the transitions feeding a place.
    pub fn incoming_labels(&self, place: &str) -> Vec<&str> {
        self.arcs
            .iter()
            .filter(|a| a.target == place)
            .filter_map(|a| self.transition_label(&a.source))
            .collect()
    }

    /// Labels of the transitions drained by a place.
    pub fn outgoing_labels(&self, place: &str) -> Vec<&str> {
        self.arcs
            .iter()
            .filter(|a| a.source == place)
            .filter_map(|a| self.transition_label(&a.target))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal net for one course: start -> QXD0001 -> p_wait ->
    /// QXD0001_APROVADO -> end, plus a verificador tail.
    pub(crate) fn course_model() -> ProcessModel {
        let raw = serde_json::json!({
            "places": [
                {"id": "p_start"}, {"id": "p_wait"}, {"id": "p_done"}, {"id": "p_end"}
            ],
            "transitions": [
                {"id": "t_take", "label": "QXD0001"},
                {"id": "t_pass", "label": "QXD0001_APROVADO"},
                {"id": "t_grad", "label": "verificador"}
            ],
            "arcs": [
                {"source": "p_start", "target": "t_take"},
                {"source": "t_take", "target": "p_wait"},
                {"source": "p_wait", "target": "t_pass"},
                {"source": "t_pass", "target": "p_done"},
                {"source": "p_done", "target": "t_grad"},
                {"source": "t_grad", "target": "p_end"}
            ],
            "initial_marking": {"p_start": 1},
            "final_marking": {"p_end": 1}
        });
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn arc_structure_queries_resolve_labels() {
        let model = course_model();
        assert_eq!(model.incoming_labels("p_wait"), vec!["QXD0001"]);
        assert_eq!(model.outgoing_labels("p_wait"), vec!["QXD0001_APROVADO"]);
        assert_eq!(model.input_places("t_pass"), vec!["p_wait"]);
        assert_eq!(model.output_places("t_take"), vec!["p_wait"]);
        assert!(model.transition_by_label("verificador").is_some());
    }

    #[test]
    fn validation_rejects_dangling_arcs() {
        let mut model = course_model();
        model.arcs.push(Arc {
            source: "nowhere".to_string(),
            target: "p_end".to_string(),
        });
        assert!(model.validate().is_err());
    }
}
