//! Plan execution.
//!
//! Images are built in topological order. With a concurrency above one,
//! independent branches of the hierarchy are built side by side, but an
//! image never starts before its in-plan base has been built (and pushed,
//! when pushing is enabled). The first failure cancels every build still
//! in flight and is returned with the failing image's name.

use crate::action::{BuildAction, BuiltImage, PushAction};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{self, JoinSet};
use tracing::{error, info};
use ursa_core::{Error, ImageId, ImageSet, ResolvedImage, Result};
use ursa_scheduler::{BuildGraph, BuildPlan, plan};

/// Result of a successful build run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Built images in completion order.
    pub built: Vec<BuiltImage>,
    /// References pushed to the registry.
    pub pushed: Vec<String>,
    pub duration_ms: u64,
}

pub struct ImageBuilder {
    build: Arc<dyn BuildAction>,
    push: Option<Arc<dyn PushAction>>,
    concurrency: usize,
}

impl ImageBuilder {
    pub fn new(build: Arc<dyn BuildAction>) -> Self {
        Self {
            build,
            push: None,
            concurrency: 1,
        }
    }

    /// Push every image right after it has been built.
    pub fn with_push(mut self, push: Arc<dyn PushAction>) -> Self {
        self.push = Some(push);
        self
    }

    /// Maximum number of images built at the same time.
    pub fn concurrency(mut self, jobs: usize) -> Self {
        self.concurrency = jobs.max(1);
        self
    }

    /// Validate, order and build `set`.
    pub async fn run(&self, set: &ImageSet<'_>) -> Result<BuildReport> {
        let start = Instant::now();
        let plan = plan(set)?;

        info!(
            images = plan.len(),
            concurrency = self.concurrency,
            push = self.push.is_some(),
            "Starting image builds"
        );

        let mut report = if self.concurrency == 1 {
            self.run_sequential(plan).await?
        } else {
            self.run_parallel(set, plan).await?
        };

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            built = report.built.len(),
            pushed = report.pushed.len(),
            duration_ms = report.duration_ms,
            "Image builds finished"
        );
        Ok(report)
    }

    async fn run_sequential(&self, plan: BuildPlan) -> Result<BuildReport> {
        let mut report = BuildReport::default();
        for planned in plan.images {
            let (built, pushed) =
                build_one(self.build.clone(), self.push.clone(), planned.image).await?;
            report.built.push(built);
            report.pushed.extend(pushed);
        }
        Ok(report)
    }

    async fn run_parallel(&self, set: &ImageSet<'_>, plan: BuildPlan) -> Result<BuildReport> {
        let mut report = BuildReport::default();
        let graph = BuildGraph::new(set);

        let position: HashMap<ImageId, usize> = plan
            .iter()
            .map(|planned| (planned.image.id, planned.position))
            .collect();
        let mut images: Vec<Option<ResolvedImage>> =
            plan.images.into_iter().map(|planned| Some(planned.image)).collect();

        // Ready images keyed by plan position
        let mut ready: BinaryHeap<Reverse<usize>> = graph
            .roots()
            .into_iter()
            .filter_map(|id| position.get(&id).copied().map(Reverse))
            .collect();
        let mut completed: HashSet<ImageId> = HashSet::new();
        let mut running: HashMap<task::Id, String> = HashMap::new();
        let mut join_set = JoinSet::new();

        loop {
            while join_set.len() < self.concurrency {
                let Some(Reverse(pos)) = ready.pop() else {
                    break;
                };
                let Some(image) = images[pos].take() else {
                    continue;
                };
                let name = image.qualified_name.clone();
                let handle = join_set.spawn(build_one(self.build.clone(), self.push.clone(), image));
                running.insert(handle.id(), name);
            }

            let Some(joined) = join_set.join_next_with_id().await else {
                break;
            };

            let outcome = match joined {
                Ok((task_id, result)) => {
                    running.remove(&task_id);
                    result
                }
                Err(e) => Err(Error::BuildFailed {
                    image: running
                        .remove(&e.id())
                        .unwrap_or_else(|| "<unknown>".to_string()),
                    source: Box::new(e),
                }),
            };

            match outcome {
                Ok((built, pushed)) => {
                    completed.insert(built.id);
                    for child in graph.dependents(built.id) {
                        if graph.is_ready(child, &completed)
                            && let Some(&pos) = position.get(&child)
                        {
                            ready.push(Reverse(pos));
                        }
                    }
                    report.built.push(built);
                    report.pushed.extend(pushed);
                }
                Err(e) => {
                    error!(in_flight = join_set.len(), "Cancelling remaining builds");
                    join_set.shutdown().await;
                    return Err(e);
                }
            }
        }

        Ok(report)
    }
}

/// Build a single image and optionally push it.
async fn build_one(
    build: Arc<dyn BuildAction>,
    push: Option<Arc<dyn PushAction>>,
    image: ResolvedImage,
) -> Result<(BuiltImage, Option<String>)> {
    info!(image = %image.qualified_name, "Start building");
    let built = build
        .build(&image)
        .await
        .map_err(|e| {
            error!(image = %image.qualified_name, error = %e, "Build failed");
            Error::BuildFailed {
                image: image.qualified_name.clone(),
                source: Box::new(e),
            }
        })?;
    info!(
        image = %built.qualified_name,
        duration_ms = built.duration_ms,
        "Image has been built successfully"
    );

    let Some(push) = push else {
        return Ok((built, None));
    };

    push.push(&built).await.map_err(|e| {
        error!(image = %built.qualified_name, error = %e, "Push failed");
        Error::PushFailed {
            image: built.qualified_name.clone(),
            source: Box::new(e),
        }
    })?;
    info!(reference = %built.reference, "Image has been pushed");

    let reference = built.reference.clone();
    Ok((built, Some(reference)))
}
