//! Fan-out of highlight detection across all segments.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use matchreel_models::Segment;

use crate::detector::HighlightDetector;
use crate::error::{PipelineError, PipelineResult};

/// Runs one detector task per segment and merges the results.
pub struct AnalysisCoordinator {
    detector: Arc<HighlightDetector>,
    /// Caps concurrent inference calls when set
    limiter: Option<Arc<Semaphore>>,
}

impl AnalysisCoordinator {
    /// `max_parallel` of 0 launches every segment at once.
    pub fn new(detector: Arc<HighlightDetector>, max_parallel: usize) -> Self {
        Self {
            detector,
            limiter: (max_parallel > 0).then(|| Arc::new(Semaphore::new(max_parallel))),
        }
    }

    /// All highlight instants across `segments`, sorted ascending.
    pub async fn analyze_all(&self, segments: &[Segment]) -> Vec<f64> {
        self.analyze_all_with_progress(segments, |_, _| {}).await
    }

    /// Like [`analyze_all`](Self::analyze_all), calling `on_complete(done, total)`
    /// each time a segment finishes.
    ///
    /// A failed join is logged and yields an empty list.
    pub async fn analyze_all_with_progress<F>(&self, segments: &[Segment], on_complete: F) -> Vec<f64>
    where
        F: FnMut(usize, usize),
    {
        info!("Starting analysis of {} segments in parallel", segments.len());
        let started = Instant::now();

        match self.join_all(segments, on_complete).await {
            Ok(mut instants) => {
                instants.sort_by(f64::total_cmp);
                info!(
                    "Total highlights found across all segments: {} in {:.2}s",
                    instants.len(),
                    started.elapsed().as_secs_f64()
                );
                instants
            }
            Err(e) => {
                error!("Error in parallel analysis: {}", e);
                Vec::new()
            }
        }
    }

    async fn join_all<F>(&self, segments: &[Segment], mut on_complete: F) -> PipelineResult<Vec<f64>>
    where
        F: FnMut(usize, usize),
    {
        let total = segments.len();
        let mut tasks = JoinSet::new();

        for segment in segments.iter().cloned() {
            let detector = Arc::clone(&self.detector);
            let limiter = self.limiter.clone();
            tasks.spawn(async move {
                // Held until the detector returns
                let _permit = match limiter {
                    Some(sem) => Some(sem.acquire_owned().await),
                    None => None,
                };
                let instants = detector.detect(&segment).await;
                (segment, instants)
            });
        }

        let mut all = Vec::new();
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            let (segment, instants) = joined.map_err(|e| PipelineError::task_failed(e.to_string()))?;
            done += 1;
            info!(
                segment = segment.index + 1,
                "Segment {} ({:.0}-{:.0}s): {} highlights",
                segment.index + 1,
                segment.start_offset,
                segment.end_offset,
                instants.len()
            );
            all.extend(instants);
            on_complete(done, total);
        }

        Ok(all)
    }
}
