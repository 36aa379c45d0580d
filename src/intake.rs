//! File-name intake and the configuration error shared with flag intake.

use std::path::Path;

use crate::pipeline::SourceFile;
use crate::token::FileId;

/// File extensions the front end accepts, without the leading dot.
pub const EXTENSIONS: [&str; 3] = ["ch", "ry", "cherry"];

/// Problem with the command line: a rejected file or a bad flag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("'{name}' rejected: {reason}")]
    RejectedFile { name: String, reason: String },
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),
    #[error("flag '--{0}' requires a value")]
    MissingValue(&'static str),
    #[error("flag '--{0}' does not take a value")]
    UnexpectedValue(&'static str),
    #[error("invalid value '{value}' for '--{flag}': {reason}")]
    InvalidValue {
        flag: &'static str,
        value: String,
        reason: String,
    },
    #[error("'--{0}' and '--{1}' cannot be used together")]
    Conflict(&'static str, &'static str),
}

/// Check that `name` ends in one of [`EXTENSIONS`]. The match is exact and
/// case-sensitive.
///
/// # Errors
///
/// Returns [`ConfigError::RejectedFile`] naming the offending suffix, or
/// saying there is none.
pub fn check_extension(name: &str) -> Result<(), ConfigError> {
    let reason = match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) if EXTENSIONS.contains(&ext) => return Ok(()),
        Some(ext) => format!(
            "unsupported extension '.{ext}' (expected {})",
            expected_list()
        ),
        None => format!("no file extension (expected {})", expected_list()),
    };
    Err(ConfigError::RejectedFile {
        name: name.to_string(),
        reason,
    })
}

fn expected_list() -> String {
    EXTENSIONS
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Files accepted for compilation plus the names that were turned away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Intake {
    pub files: Vec<SourceFile>,
    pub rejected: Vec<ConfigError>,
}

/// Validates file names given on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileIntake;

impl FileIntake {
    /// Accept every name with a known extension. Accepted files get
    /// consecutive [`FileId`]s in argument order.
    pub fn accept<I, S>(names: I) -> Intake
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut intake = Intake::default();
        for name in names {
            let name = name.as_ref();
            match check_extension(name) {
                Ok(()) => {
                    let id = FileId(u32::try_from(intake.files.len()).unwrap_or(u32::MAX));
                    intake.files.push(SourceFile::from_path(id, name));
                }
                Err(e) => {
                    tracing::warn!(%e, "file rejected");
                    intake.rejected.push(e);
                }
            }
        }
        intake
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_extensions() {
        for name in ["main.ch", "lib/util.ry", "a.b.cherry", "/abs/path/x.ch"] {
            assert_eq!(check_extension(name), Ok(()), "{name}");
        }
    }

    #[test]
    fn extension_is_case_sensitive() {
        let err = check_extension("MAIN.CH").expect_err("should reject");
        assert!(err.to_string().contains("'.CH'"), "{err}");
    }

    #[test]
    fn reason_names_the_suffix() {
        let err = check_extension("notes.txt").expect_err("should reject");
        assert_eq!(
            err,
            ConfigError::RejectedFile {
                name: "notes.txt".to_string(),
                reason: "unsupported extension '.txt' (expected .ch, .ry, .cherry)".to_string(),
            }
        );
    }

    #[test]
    fn missing_extension() {
        let err = check_extension("Makefile").expect_err("should reject");
        assert!(err.to_string().contains("no file extension"), "{err}");
        assert!(check_extension("cherry").is_err());
        assert!(check_extension("archive.ch.bak").is_err());
    }

    #[test]
    fn accept_splits_and_numbers() {
        let intake = FileIntake::accept(["a.ch", "b.txt", "c.ry", "d"]);
        assert_eq!(intake.files.len(), 2);
        assert_eq!(intake.files[0].id, FileId(0));
        assert_eq!(intake.files[0].name, "a.ch");
        assert_eq!(intake.files[1].id, FileId(1));
        assert_eq!(intake.files[1].name, "c.ry");
        assert_eq!(intake.rejected.len(), 2);
    }
}
