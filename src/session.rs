//! Start-up configuration and the lazily built transition table shared by
//! every pipeline in a run.

use std::num::NonZeroUsize;
use std::sync::OnceLock;

use tracing::debug;

use crate::automaton::TransitionTable;
use crate::flags::{Flag, RaisedFlags};

/// Start-up configuration shared by every worker.
///
/// The transition table is built on first use. Concurrent first calls to
/// [`Session::table`] block until one of them has built it, and all of them
/// observe the same table.
#[derive(Debug, Default)]
pub struct Session {
    flags: RaisedFlags,
    table: OnceLock<TransitionTable>,
}

impl Session {
    #[must_use]
    pub const fn new(flags: RaisedFlags) -> Self {
        Self {
            flags,
            table: OnceLock::new(),
        }
    }

    #[must_use]
    pub const fn flags(&self) -> &RaisedFlags {
        &self.flags
    }

    pub fn table(&self) -> &TransitionTable {
        self.table.get_or_init(|| {
            debug!("building transition table");
            TransitionTable::build()
        })
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.flags.is_raised(Flag::Strict)
    }

    /// Whether outcomes keep their tokens after parsing, for `--dump-tokens`.
    #[must_use]
    pub fn keeps_tokens(&self) -> bool {
        self.flags.is_raised(Flag::DumpTokens)
    }

    /// Worker count: one under `--sequential`, otherwise `--jobs` if given.
    #[must_use]
    pub fn jobs(&self) -> Option<NonZeroUsize> {
        if self.flags.is_raised(Flag::Sequential) {
            Some(NonZeroUsize::MIN)
        } else {
            self.flags.jobs()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagIntake;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn table_is_built_once_under_concurrent_first_use() {
        let session = Session::default();
        let barrier = Barrier::new(8);
        let (session, barrier) = (&session, &barrier);
        let addresses: Vec<usize> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(move || {
                        barrier.wait();
                        std::ptr::from_ref(session.table()) as usize
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("thread panicked"))
                .collect()
        });
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(*session.table(), TransitionTable::build());
    }

    #[test]
    fn sequential_forces_one_worker() {
        let (flags, _) = FlagIntake::raise(["--jobs=6", "--sequential"]);
        let session = Session::new(flags);
        assert_eq!(session.jobs(), NonZeroUsize::new(1));
    }

    #[test]
    fn jobs_and_strict_come_from_flags() {
        let (flags, _) = FlagIntake::raise(["-j3", "--strict"]);
        let session = Session::new(flags);
        assert_eq!(session.jobs(), NonZeroUsize::new(3));
        assert!(session.is_strict());
        assert_eq!(Session::default().jobs(), None);
    }

    #[test]
    fn dump_tokens_keeps_tokens() {
        let (flags, _) = FlagIntake::raise(["--dump-tokens"]);
        assert!(Session::new(flags).keeps_tokens());
        assert!(!Session::default().keeps_tokens());
    }
}
