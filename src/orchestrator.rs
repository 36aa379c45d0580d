//! Fan-out of one [`ParsePipeline`] per file over a bounded rayon pool.
//!
//! Files are independent. The only shared state is the session's
//! transition table, and the only synchronization point is the join at the
//! end of [`Orchestrator::run`].

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::ast::ParseTree;
use crate::pipeline::{FileOutcome, ParsePipeline, SourceFile};
use crate::session::Session;
use crate::token::FileId;

/// Stack reserved for each worker thread.
const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

/// The worker pool could not be started.
#[derive(Debug, thiserror::Error)]
#[error("cannot start worker pool: {0}")]
pub struct PoolError(#[from] rayon::ThreadPoolBuildError);

/// Every file's outcome, in the order the files were given.
#[derive(Debug, Default)]
pub struct Report {
    outcomes: Vec<FileOutcome>,
}

impl Report {
    #[must_use]
    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Whether every file produced a tree.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(FileOutcome::is_ok)
    }

    /// Trees of the files that succeeded, keyed by file.
    #[must_use]
    pub fn into_trees(self) -> BTreeMap<FileId, ParseTree> {
        self.outcomes
            .into_iter()
            .filter_map(|o| o.result.ok().map(|tree| (o.source.id, tree)))
            .collect()
    }
}

/// Runs the per-file pipelines for a batch of files.
#[derive(Debug, Clone, Copy)]
pub struct Orchestrator<'s> {
    session: &'s Session,
}

impl<'s> Orchestrator<'s> {
    #[must_use]
    pub const fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Run every file to completion and collect the results.
    ///
    /// A failing file never affects the others.
    pub fn run(&self, files: Vec<SourceFile>) -> Result<Report, PoolError> {
        let jobs = self.session.jobs();
        debug!(files = files.len(), jobs = ?jobs, "starting pipelines");

        let outcomes: Vec<FileOutcome> = if files.len() <= 1 || jobs.is_some_and(|n| n.get() == 1) {
            files.into_iter().map(|file| self.run_file(file)).collect()
        } else {
            let mut builder = rayon::ThreadPoolBuilder::new()
                .thread_name(|i| format!("cherry-worker-{i}"))
                .stack_size(WORKER_STACK_SIZE);
            if let Some(n) = jobs {
                builder = builder.num_threads(n.get());
            }
            let pool = builder.build()?;
            pool.install(|| {
                files
                    .into_par_iter()
                    .map(|file| self.run_file(file))
                    .collect()
            })
        };

        let report = Report { outcomes };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "pipelines finished"
        );
        Ok(report)
    }

    fn run_file(&self, file: SourceFile) -> FileOutcome {
        ParsePipeline::new(file)
            .strict(self.session.is_strict())
            .keep_tokens(self.session.keeps_tokens())
            .complete(self.session.table())
    }
}
