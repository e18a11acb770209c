//! Run registry.
//!
//! An explicit, externally owned collection of finalized runs, passed by
//! reference into collaborators. There is no process-wide singleton.

use std::collections::HashMap;

use uuid::Uuid;

use crate::pipeline::FormationRun;

#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: HashMap<Uuid, FormationRun>,
    latest: Option<Uuid>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finalized run and mark it as the latest.
    pub fn insert(&mut self, run: FormationRun) -> Uuid {
        let id = run.id;
        self.runs.insert(id, run);
        self.latest = Some(id);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&FormationRun> {
        self.runs.get(id)
    }

    /// Most recently inserted run, if any.
    pub fn latest(&self) -> Option<&FormationRun> {
        self.latest.and_then(|id| self.runs.get(&id))
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
