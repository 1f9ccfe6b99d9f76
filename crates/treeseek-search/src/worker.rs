//! Worker loop: pop a directory, list it, match names, push subdirectories.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, info, trace};

use treeseek_core::{DirEntryInfo, Match, SearchError, Task};

use crate::coordinator::SearchRun;
use crate::queue::Pop;

/// Completes one popped task when dropped, unwinding included.
struct TaskGuard<'a> {
    run: &'a SearchRun,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        if self.run.queue.complete() {
            self.run.finish();
        }
    }
}

/// Run until the queue reports stop, the deadline passes, or the run is cancelled.
pub(crate) fn worker_loop(id: usize, run: Arc<SearchRun>) {
    debug!(worker = id, "Worker started");
    let mut processed: u64 = 0;

    loop {
        let task = match run.queue.pop() {
            Pop::Task(task) => task,
            Pop::Stop => break,
            Pop::Expired => {
                info!(worker = id, "Search deadline elapsed, cancelling");
                run.cancel();
                break;
            }
        };

        if run.is_cancelled() {
            trace!(worker = id, dir = %task.path.display(), "Abandoning task after cancel");
            run.queue.abandon();
            continue;
        }

        let guard = TaskGuard { run: &run };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| process_task(&run, &task)));
        if outcome.is_err() {
            error!(worker = id, dir = %task.path.display(), "Worker panicked, directory abandoned");
            run.results.add_error(SearchError::aborted(&task.path));
        }
        processed += 1;
        drop(guard);
    }

    debug!(worker = id, processed, "Worker exiting");
    run.worker_exited();
}

/// Enumerate one directory and feed its results back into the run.
fn process_task(run: &SearchRun, task: &Task) {
    debug!(dir = %task.path.display(), depth = task.depth, "Searching");

    let listing = match run.enumerator.enumerate(&task.path) {
        Ok(listing) => listing,
        Err(err) => {
            run.progress.record_error();
            run.results.add_error(err);
            return;
        }
    };
    for err in listing.errors {
        run.progress.record_error();
        run.results.add_error(err);
    }
    let entries = listing.entries;

    let depth = task.child_depth();
    let mut matches = Vec::new();

    if run.config.within_depth(depth) {
        for entry in &entries {
            trace!(path = %entry.path.display(), kind = ?entry.kind, "Entry");

            if run.should_skip(entry) {
                continue;
            }

            if run.config.match_kind.accepts(entry.kind) && run.predicate.matches(&entry.name) {
                matches.push(Match::new(&entry.path, depth));
            }

            if entry.is_dir() && run.config.may_descend(depth) && !run.is_cancelled() {
                schedule(run, entry, depth);
            }
        }
    }

    let found = run.results.add_matches(matches);
    run.progress.record_dir(&task.path, entries.len() as u64, found as u64);
}

/// Claim a subdirectory and enqueue it if nobody has before.
fn schedule(run: &SearchRun, entry: &DirEntryInfo, depth: u32) {
    let identity = match run.enumerator.identify(&entry.path) {
        Ok(identity) => identity,
        Err(err) => {
            run.progress.record_error();
            run.results.add_error(SearchError::from_io(&entry.path, &err));
            return;
        }
    };

    if run.crosses_device(identity.device()) {
        trace!(dir = %entry.path.display(), "Skipping directory on another device");
        run.progress.record_skip();
        return;
    }

    if run.visited.try_visit(identity) {
        run.queue.push(Task::new(&entry.path, depth));
    } else {
        trace!(dir = %entry.path.display(), "Skipping already visited directory");
        run.progress.record_skip();
    }
}
