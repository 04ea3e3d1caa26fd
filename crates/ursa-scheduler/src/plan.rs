//! Build plans.
//!
//! A plan is the validated, ordered list of resolved images a build run
//! will go through. Plans serialize deterministically so that successive
//! runs can be diffed.

use crate::dag::BuildGraph;
use serde::Serialize;
use tracing::info;
use ursa_core::{ImageSet, ResolvedImage, Result};

#[derive(Debug, Clone, Serialize)]
pub struct PlannedImage {
    pub position: usize,
    /// Qualified name of the planned image this one waits for.
    pub depends_on: Option<String>,
    #[serde(flatten)]
    pub image: ResolvedImage,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildPlan {
    pub images: Vec<PlannedImage>,
}

impl BuildPlan {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedImage> {
        self.images.iter()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Resolve `set` into build order.
///
/// Qualified names must be unique across the whole collection behind `set`,
/// not only within the selection.
pub fn plan(set: &ImageSet<'_>) -> Result<BuildPlan> {
    set.collection().validate()?;

    let dag = BuildGraph::new(set);
    let order = dag.topological_order()?;
    let collection = set.collection();

    let images = order
        .into_iter()
        .enumerate()
        .map(|(position, id)| {
            let depends_on = dag
                .base_of(id)
                .and_then(|base| collection.get(base))
                .map(|base| base.qualified_name());
            Ok(PlannedImage {
                position,
                depends_on,
                image: collection.resolve(id)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(images = images.len(), "Planned image builds");
    Ok(BuildPlan { images })
}
