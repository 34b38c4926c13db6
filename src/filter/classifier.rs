use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("failed to read word list {path}: {source}")]
    WordList {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build word pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("classifier command is empty")]
    EmptyCommand,
    #[error("failed to run classifier command: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("classifier command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
    #[error("classifier output is not a JSON array of flags: {0}")]
    BadOutput(#[source] serde_json::Error),
    #[error("classifier returned {got} flags for {expected} inputs")]
    LengthMismatch { expected: usize, got: usize },
}

/// Binary text classifier: one flag per input, `true` meaning offensive.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify each text independently.
    async fn predict(&self, texts: &[String]) -> Result<Vec<bool>, ClassifierError>;
}

/// Words flagged by the built-in classifier. Matched case-insensitively on word boundaries.
const DEFAULT_WORDS: &[&str] = &[
    "arse",
    "arsehole",
    "asshole",
    "bastard",
    "bitch",
    "bitches",
    "bollocks",
    "bullshit",
    "cock",
    "cocksucker",
    "cunt",
    "cunts",
    "dick",
    "dickhead",
    "fag",
    "faggot",
    "fuck",
    "fucked",
    "fucker",
    "fucking",
    "fucks",
    "motherfucker",
    "nigga",
    "nigger",
    "piss",
    "pissed",
    "prick",
    "pussy",
    "retard",
    "shit",
    "shits",
    "shitty",
    "slut",
    "twat",
    "wanker",
    "whore",
];

static DEFAULT_PATTERN: Lazy<Regex> =
    Lazy::new(|| build_pattern(DEFAULT_WORDS.iter().copied()).expect("default word pattern"));

fn build_pattern<'a>(words: impl Iterator<Item = &'a str>) -> Result<Regex, regex::Error> {
    let alternatives: Vec<String> = words.map(regex::escape).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
}

/// Word-list classifier, used unless an external classifier command is configured.
pub struct WordListClassifier {
    pattern: Regex,
}

impl WordListClassifier {
    /// Classifier using only the built-in word list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
        }
    }

    /// Built-in list extended with `extra` words.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined pattern cannot be compiled.
    pub fn with_extra_words<S: AsRef<str>>(extra: &[S]) -> Result<Self, ClassifierError> {
        let words = DEFAULT_WORDS
            .iter()
            .copied()
            .chain(extra.iter().map(|w| w.as_ref()))
            .map(str::trim)
            .filter(|w| !w.is_empty());
        Ok(Self {
            pattern: build_pattern(words)?,
        })
    }

    /// Built-in list extended with the words in `path`, one per line. Lines starting
    /// with `#` are comments.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the pattern cannot be compiled.
    pub async fn from_file(path: &Path) -> Result<Self, ClassifierError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ClassifierError::WordList {
                    path: path.display().to_string(),
                    source,
                })?;
        let extra: Vec<&str> = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        debug!(path = %path.display(), words = extra.len(), "Loaded extra profanity words");
        Self::with_extra_words(&extra)
    }
}

impl Default for WordListClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for WordListClassifier {
    async fn predict(&self, texts: &[String]) -> Result<Vec<bool>, ClassifierError> {
        Ok(texts.iter().map(|t| self.pattern.is_match(t)).collect())
    }
}

/// Runs an external program as the classifier.
///
/// The program receives a JSON array of strings on stdin and must print a JSON array
/// of `0`/`1` flags of the same length on stdout.
pub struct CommandClassifier {
    program: String,
    args: Vec<String>,
}

impl CommandClassifier {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command line. No shell quoting is supported.
    ///
    /// # Errors
    ///
    /// Returns an error if the command line is empty.
    pub fn from_command_line(cmdline: &str) -> Result<Self, ClassifierError> {
        let mut parts = cmdline.split_whitespace().map(ToString::to_string);
        let program = parts.next().ok_or(ClassifierError::EmptyCommand)?;
        Ok(Self::new(program, parts.collect()))
    }
}

#[async_trait]
impl Classifier for CommandClassifier {
    async fn predict(&self, texts: &[String]) -> Result<Vec<bool>, ClassifierError> {
        let input = serde_json::to_vec(texts).map_err(ClassifierError::BadOutput)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ClassifierError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&input).await.map_err(ClassifierError::Spawn)?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(ClassifierError::Spawn)?;

        if !output.status.success() {
            return Err(ClassifierError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let flags: Vec<i64> =
            serde_json::from_slice(&output.stdout).map_err(ClassifierError::BadOutput)?;
        if flags.len() != texts.len() {
            return Err(ClassifierError::LengthMismatch {
                expected: texts.len(),
                got: flags.len(),
            });
        }

        Ok(flags.into_iter().map(|f| f != 0).collect())
    }
}
