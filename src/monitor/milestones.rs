// src/monitor/milestones.rs

//! Milestone phrase table.
//!
//! Matching is a plain substring test against raw log text. It is a
//! heuristic: any line that happens to contain one of the phrases counts,
//! whatever produced it.

use crate::types::MilestoneKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub phrase: String,
    pub kind: MilestoneKind,
}

impl Milestone {
    pub fn new(phrase: impl Into<String>, kind: MilestoneKind) -> Self {
        Self {
            phrase: phrase.into(),
            kind,
        }
    }
}

/// Ordered phrase → kind table. The first matching entry wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneTable {
    entries: Vec<Milestone>,
}

impl Default for MilestoneTable {
    /// Progress markers printed by the consensus node.
    fn default() -> Self {
        Self::new(vec![
            Milestone::new("Vertex committed", MilestoneKind::VertexCommitted),
            Milestone::new("DAG has reached", MilestoneKind::RoundReached),
            Milestone::new("Finished the last round", MilestoneKind::WaveFinished),
            Milestone::new("Selected a vertex leader", MilestoneKind::LeaderSelected),
        ])
    }
}

impl MilestoneTable {
    pub fn new(entries: Vec<Milestone>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Milestone] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kind of the first phrase contained in `line`, if any.
    pub fn classify(&self, line: &str) -> Option<MilestoneKind> {
        self.entries
            .iter()
            .find(|m| line.contains(m.phrase.as_str()))
            .map(|m| m.kind)
    }
}
