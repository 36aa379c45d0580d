//! Command-line flags.
//!
//! [`FlagIntake::raise`] turns dash-prefixed arguments into an immutable
//! [`RaisedFlags`] set. Problems are reported, never dropped.

use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroUsize;

use crate::intake::ConfigError;

/// Every flag the driver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    Verbose,
    Quiet,
    /// Treat lexical errors as fatal for the file.
    Strict,
    /// Run pipelines one at a time.
    Sequential,
    DumpTokens,
    DumpTree,
    /// Worker count, `--jobs=N` or `-jN`.
    Jobs,
}

impl Flag {
    pub const ALL: [Self; 7] = [
        Self::Verbose,
        Self::Quiet,
        Self::Strict,
        Self::Sequential,
        Self::DumpTokens,
        Self::DumpTree,
        Self::Jobs,
    ];

    #[must_use]
    pub const fn long(self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Strict => "strict",
            Self::Sequential => "sequential",
            Self::DumpTokens => "dump-tokens",
            Self::DumpTree => "dump-tree",
            Self::Jobs => "jobs",
        }
    }

    #[must_use]
    pub const fn short(self) -> Option<char> {
        match self {
            Self::Verbose => Some('v'),
            Self::Quiet => Some('q'),
            Self::Jobs => Some('j'),
            _ => None,
        }
    }

    #[must_use]
    pub const fn takes_value(self) -> bool {
        matches!(self, Self::Jobs)
    }

    /// One-line description for usage output.
    #[must_use]
    pub const fn help(self) -> &'static str {
        match self {
            Self::Verbose => "log pipeline stages",
            Self::Quiet => "only log errors",
            Self::Strict => "fail a file on any lexical error",
            Self::Sequential => "process files one at a time",
            Self::DumpTokens => "print each file's tokens",
            Self::DumpTree => "print each file's syntax tree",
            Self::Jobs => "number of worker threads",
        }
    }

    #[must_use]
    pub fn from_long(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.long() == name)
    }

    #[must_use]
    pub fn from_short(ch: char) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.short() == Some(ch))
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}", self.long())
    }
}

/// The set of flags raised on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaisedFlags {
    raised: BTreeSet<Flag>,
    jobs: Option<NonZeroUsize>,
}

impl RaisedFlags {
    #[must_use]
    pub fn is_raised(&self, flag: Flag) -> bool {
        self.raised.contains(&flag)
    }

    /// Worker count from `--jobs`, if given.
    #[must_use]
    pub const fn jobs(&self) -> Option<NonZeroUsize> {
        self.jobs
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.raised.iter().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raised.is_empty()
    }
}

/// Registered-flag validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagIntake;

impl FlagIntake {
    /// Raise every recognized flag in `args`.
    ///
    /// Long flags are `--name` or `--name=value`. Short flags may be
    /// grouped (`-vq`); a short flag that takes a value consumes the rest
    /// of its group (`-j4`). Raising a flag twice is harmless; for `--jobs`
    /// the last value wins.
    pub fn raise<I, S>(args: I) -> (RaisedFlags, Vec<ConfigError>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = RaisedFlags::default();
        let mut errors = Vec::new();

        for arg in args {
            let arg = arg.as_ref();
            let result = if let Some(long) = arg.strip_prefix("--") {
                raise_long(&mut flags, long)
            } else if let Some(short) = arg.strip_prefix('-').filter(|s| !s.is_empty()) {
                raise_short(&mut flags, short)
            } else {
                Err(ConfigError::UnknownFlag(arg.to_string()))
            };
            if let Err(e) = result {
                errors.push(e);
            }
        }

        if flags.is_raised(Flag::Verbose) && flags.is_raised(Flag::Quiet) {
            errors.push(ConfigError::Conflict(Flag::Verbose.long(), Flag::Quiet.long()));
        }

        (flags, errors)
    }
}

fn raise_long(flags: &mut RaisedFlags, text: &str) -> Result<(), ConfigError> {
    let (name, value) = match text.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (text, None),
    };
    let flag = Flag::from_long(name).ok_or_else(|| ConfigError::UnknownFlag(format!("--{name}")))?;
    raise(flags, flag, value)
}

fn raise_short(flags: &mut RaisedFlags, group: &str) -> Result<(), ConfigError> {
    for (i, ch) in group.char_indices() {
        let flag = Flag::from_short(ch).ok_or_else(|| ConfigError::UnknownFlag(format!("-{ch}")))?;
        if flag.takes_value() {
            let rest = &group[i + ch.len_utf8()..];
            return raise(flags, flag, Some(rest).filter(|r| !r.is_empty()));
        }
        raise(flags, flag, None)?;
    }
    Ok(())
}

fn raise(flags: &mut RaisedFlags, flag: Flag, value: Option<&str>) -> Result<(), ConfigError> {
    match (flag.takes_value(), value) {
        (true, None) => return Err(ConfigError::MissingValue(flag.long())),
        (false, Some(_)) => return Err(ConfigError::UnexpectedValue(flag.long())),
        (true, Some(value)) => flags.jobs = Some(parse_jobs(value)?),
        (false, None) => {}
    }
    flags.raised.insert(flag);
    Ok(())
}

fn parse_jobs(value: &str) -> Result<NonZeroUsize, ConfigError> {
    value
        .parse::<NonZeroUsize>()
        .map_err(|e| ConfigError::InvalidValue {
            flag: Flag::Jobs.long(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_and_short_names_are_unique() {
        for a in Flag::ALL {
            for b in Flag::ALL {
                if a != b {
                    assert_ne!(a.long(), b.long());
                    assert!(a.short().is_none() || a.short() != b.short());
                }
            }
        }
    }

    #[test]
    fn raise_long_flags() {
        let (flags, errors) = FlagIntake::raise(["--strict", "--dump-tree"]);
        assert!(errors.is_empty());
        assert!(flags.is_raised(Flag::Strict));
        assert!(flags.is_raised(Flag::DumpTree));
        assert!(!flags.is_raised(Flag::Verbose));
    }

    #[test]
    fn raise_grouped_short_flags() {
        let (flags, errors) = FlagIntake::raise(["-vj4"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(flags.is_raised(Flag::Verbose));
        assert_eq!(flags.jobs(), NonZeroUsize::new(4));
    }

    #[test]
    fn jobs_last_value_wins() {
        let (flags, errors) = FlagIntake::raise(["--jobs=2", "-j8"]);
        assert!(errors.is_empty());
        assert_eq!(flags.jobs(), NonZeroUsize::new(8));
    }

    #[test]
    fn unknown_flags_are_reported() {
        let (flags, errors) = FlagIntake::raise(["--fast", "-x", "-", "--strict"]);
        assert_eq!(
            errors,
            [
                ConfigError::UnknownFlag("--fast".to_string()),
                ConfigError::UnknownFlag("-x".to_string()),
                ConfigError::UnknownFlag("-".to_string()),
            ]
        );
        assert!(flags.is_raised(Flag::Strict));
    }

    #[test]
    fn bad_values() {
        let (_, errors) = FlagIntake::raise(["--jobs", "-j0", "--strict=yes", "--jobs=many"]);
        assert_eq!(errors.len(), 4);
        assert_eq!(errors[0], ConfigError::MissingValue("jobs"));
        assert!(matches!(errors[1], ConfigError::InvalidValue { .. }));
        assert_eq!(errors[2], ConfigError::UnexpectedValue("strict"));
        assert!(errors[3].to_string().starts_with("invalid value 'many' for '--jobs'"));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let (_, errors) = FlagIntake::raise(["-v", "--quiet"]);
        assert_eq!(errors, [ConfigError::Conflict("verbose", "quiet")]);
    }

    #[test]
    fn nothing_raised() {
        let (flags, errors) = FlagIntake::raise(Vec::<String>::new());
        assert!(flags.is_empty());
        assert!(errors.is_empty());
        assert_eq!(flags.jobs(), None);
    }
}
