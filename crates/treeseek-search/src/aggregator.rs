//! Thread-safe collection of matches and errors.

use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};
use dashmap::DashSet;
use parking_lot::Mutex;
use tracing::warn;

use treeseek_core::{Match, SearchError};

/// Match stream bookkeeping. The channel exists only once a consumer asked for it.
#[derive(Debug, Default)]
struct StreamSlot {
    tx: Option<Sender<Match>>,
    taken: bool,
    closed: bool,
}

/// Collects matches and errors from all workers.
///
/// Matches, errors and the duplicate filter are locked independently.
/// Matches from one directory are appended under a single lock, which keeps
/// them in the order the filesystem reported them.
///
/// Lock order is stream, then matches.
#[derive(Debug)]
pub struct ResultAggregator {
    matches: Mutex<Vec<Match>>,
    errors: Mutex<Vec<SearchError>>,
    seen: DashSet<PathBuf>,
    stream: Mutex<StreamSlot>,
}

impl ResultAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self {
            matches: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            seen: DashSet::new(),
            stream: Mutex::new(StreamSlot::default()),
        }
    }

    /// Append the matches found in one directory.
    ///
    /// A path already recorded is dropped; the first insertion wins.
    /// Returns the number of matches actually added.
    pub fn add_matches(&self, batch: Vec<Match>) -> usize {
        if batch.is_empty() {
            return 0;
        }

        let fresh: Vec<Match> = batch
            .into_iter()
            .filter(|m| self.seen.insert(m.path.clone()))
            .collect();
        if fresh.is_empty() {
            return 0;
        }

        let stream = self.stream.lock();
        if let Some(tx) = stream.tx.as_ref() {
            for m in &fresh {
                // Receiver may have been dropped by the caller
                let _ = tx.send(m.clone());
            }
        }

        let added = fresh.len();
        self.matches.lock().extend(fresh);
        added
    }

    /// Record a directory that could not be read.
    pub fn add_error(&self, error: SearchError) {
        warn!(path = %error.path.display(), kind = ?error.kind, "{}", error.message);
        self.errors.lock().push(error);
    }

    /// Number of matches so far.
    pub fn match_count(&self) -> usize {
        self.matches.lock().len()
    }

    /// Number of errors so far.
    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    /// Open the match stream. Yields `Some` only once.
    ///
    /// Matches collected before the call are replayed first. If the stream
    /// was already closed the receiver ends after the replay.
    pub fn take_stream(&self) -> Option<Receiver<Match>> {
        let mut stream = self.stream.lock();
        if stream.taken {
            return None;
        }
        stream.taken = true;

        let (tx, rx) = crossbeam_channel::unbounded();
        for m in self.matches.lock().iter() {
            let _ = tx.send(m.clone());
        }
        if !stream.closed {
            stream.tx = Some(tx);
        }
        Some(rx)
    }

    /// Close the match stream so consumers see its end.
    pub fn close_stream(&self) {
        let mut stream = self.stream.lock();
        stream.closed = true;
        stream.tx = None;
    }

    /// Check if the match stream is being fed.
    pub fn is_streaming(&self) -> bool {
        self.stream.lock().tx.is_some()
    }

    /// Copy out everything collected.
    pub fn snapshot(&self) -> (Vec<Match>, Vec<SearchError>) {
        (self.matches.lock().clone(), self.errors.lock().clone())
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_duplicates_first_wins() {
        let agg = ResultAggregator::new();
        assert_eq!(agg.add_matches(vec![Match::new("/r/a", 1), Match::new("/r/b", 1)]), 2);
        assert_eq!(agg.add_matches(vec![Match::new("/r/a", 3)]), 0);

        let (matches, errors) = agg.snapshot();
        assert_eq!(matches, vec![Match::new("/r/a", 1), Match::new("/r/b", 1)]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_batch_order_preserved() {
        let agg = ResultAggregator::new();
        let batch: Vec<_> = ["z", "a", "m"]
            .iter()
            .map(|n| Match::new(format!("/r/{n}"), 1))
            .collect();
        agg.add_matches(batch.clone());
        assert_eq!(agg.snapshot().0, batch);
    }

    #[test]
    fn test_stream_receives_and_closes() {
        let agg = ResultAggregator::new();
        let rx = agg.take_stream().unwrap();
        assert!(agg.take_stream().is_none());

        agg.add_matches(vec![Match::new("/r/a", 1)]);
        agg.add_matches(vec![Match::new("/r/a", 1)]);
        agg.close_stream();
        agg.add_matches(vec![Match::new("/r/late", 1)]);

        let streamed: Vec<_> = rx.iter().collect();
        assert_eq!(streamed, vec![Match::new("/r/a", 1)]);
        assert_eq!(agg.match_count(), 2);
    }

    #[test]
    fn test_stream_not_fed_until_taken() {
        let agg = ResultAggregator::new();
        agg.add_matches(vec![Match::new("/r/early", 1)]);
        assert!(!agg.is_streaming());

        let rx = agg.take_stream().unwrap();
        assert!(agg.is_streaming());
        agg.add_matches(vec![Match::new("/r/late", 2)]);
        agg.close_stream();
        assert!(!agg.is_streaming());

        let streamed: Vec<_> = rx.iter().collect();
        assert_eq!(streamed, vec![Match::new("/r/early", 1), Match::new("/r/late", 2)]);
    }

    #[test]
    fn test_stream_taken_after_close_replays() {
        let agg = ResultAggregator::new();
        agg.add_matches(vec![Match::new("/r/a", 1), Match::new("/r/b", 1)]);
        agg.close_stream();

        let rx = agg.take_stream().unwrap();
        assert!(!agg.is_streaming());
        assert_eq!(rx.iter().count(), 2);
    }

    #[test]
    fn test_concurrent_adds() {
        let agg = Arc::new(ResultAggregator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let agg = Arc::clone(&agg);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        agg.add_matches(vec![Match::new(format!("/r/{i}"), 1)]);
                        agg.add_error(SearchError::permission_denied(format!("/r/d{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(agg.match_count(), 100);
        assert_eq!(agg.error_count(), 400);
    }
}
