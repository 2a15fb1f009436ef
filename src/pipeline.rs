use log::{info, warn};

use crate::error::Result;
use crate::exchange_rate::ExchangeRateRow;
use crate::fetcher::SnapshotSource;
use crate::loader::{LoadOutcome, Loader};
use crate::transformer::Transformer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    SchemaReady,
    Fetched,
    Transformed,
    Loaded,
}

#[derive(Debug, PartialEq)]
pub enum RunOutcome {
    NoData,
    TransformFailed,
    Completed {
        rows: Vec<ExchangeRateRow>,
        load: LoadOutcome,
    },
}

/// One fetch → transform → load pass, halting at the first stage that
/// produces nothing.
pub struct Pipeline {
    source: Box<dyn SnapshotSource>,
    transformer: Transformer,
    loader: Loader,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn SnapshotSource>,
        transformer: Transformer,
        loader: Loader,
    ) -> Pipeline {
        Pipeline {
            source,
            transformer,
            loader,
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let mut stage = Stage::Start;

        if !self.loader.ensure_schema().await {
            warn!("Continuing without a confirmed schema");
        }
        advance(&mut stage, Stage::SchemaReady);

        let snapshot = match self.source.fetch_snapshot().await? {
            Some(snapshot) if !snapshot.is_empty() => snapshot,
            _ => {
                warn!("No data fetched, stopping after {:?}", stage);
                return Ok(RunOutcome::NoData);
            }
        };
        advance(&mut stage, Stage::Fetched);

        let rows = match self.transformer.transform(Some(&snapshot))? {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                warn!("Data processing failed, stopping after {:?}", stage);
                return Ok(RunOutcome::TransformFailed);
            }
        };
        advance(&mut stage, Stage::Transformed);

        let load = self.loader.load(&rows).await;
        advance(&mut stage, Stage::Loaded);

        Ok(RunOutcome::Completed { rows, load })
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    info!("Pipeline stage {:?} -> {:?}", stage, next);
    *stage = next;
}
