//! Where the shared secret comes from.
//!
//! Sources are tried in a fixed order and the first one present wins. When none is given a
//! random secret is generated so the tool still demonstrates something, with a warning.

use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Args;
use dotp::{Secret, SecretError};
use tracing::{info, warn};

/// Secret options shared by every action. Not `Debug`: it may hold the secret itself.
#[derive(Args, Default)]
pub struct SecretArgs {
    /// Use the secret provided as an argument (visible in the process list)
    #[arg(long, global = true, value_name = "SECRET")]
    pub secret_unsafe_value: Option<String>,

    /// Name of the environment variable holding the secret
    #[arg(long, global = true, value_name = "ENV_NAME")]
    pub secret_env: Option<String>,

    /// Path to the file containing the secret
    #[arg(long, global = true, value_name = "PATH")]
    pub secret_file: Option<PathBuf>,

    /// Already open file descriptor to read the secret from
    #[arg(long, global = true, value_name = "FD")]
    pub secret_fd: Option<u32>,

    /// Read the secret from standard input
    #[arg(long, global = true)]
    pub secret_stdin: bool,
}

/// The source a secret was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    UnsafeValue,
    Env(String),
    File(PathBuf),
    Fd(u32),
    Stdin,
    Random,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::UnsafeValue => write!(f, "command line argument"),
            Source::Env(name) => write!(f, "environment variable {}", name),
            Source::File(path) => write!(f, "file {}", path.display()),
            Source::Fd(fd) => write!(f, "file descriptor {}", fd),
            Source::Stdin => write!(f, "standard input"),
            Source::Random => write!(f, "random generator"),
        }
    }
}

#[derive(Debug)]
pub enum SourceError {
    /// Reading the selected source failed.
    Io { source: Source, error: io::Error },
    /// The text read is not a usable secret.
    Secret { source: Source, error: SecretError },
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io { error, .. } => Some(error),
            SourceError::Secret { error, .. } => Some(error),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io { source, error } => {
                write!(f, "Error reading secret from {}: {}", source, error)
            }
            SourceError::Secret { source, error } => {
                write!(f, "Secret from {} is unusable: {}", source, error)
            }
        }
    }
}

impl SecretArgs {
    /// Load the secret from the process environment and real stdin.
    pub fn load(&self) -> Result<Secret, SourceError> {
        self.load_with(|name| std::env::var(name).ok(), io::stdin().lock())
    }

    /// Load the secret with injected environment lookup and stdin.
    pub fn load_with<E, R>(&self, env: E, stdin: R) -> Result<Secret, SourceError>
    where
        E: Fn(&str) -> Option<String>,
        R: Read,
    {
        let (source, text) = match self.read_text(env, stdin)? {
            Some(found) => found,
            None => {
                warn!("Using random secret. Provide one with --secret-env, --secret-file, --secret-fd, --secret-stdin or --secret-unsafe-value");
                return Secret::generate().map_err(|error| SourceError::Secret {
                    source: Source::Random,
                    error,
                });
            }
        };

        info!(%source, "using secret");
        Secret::from_base32(text.trim()).map_err(|error| SourceError::Secret { source, error })
    }

    /// Raw text of the first source present, `None` when no source was given.
    fn read_text<E, R>(&self, env: E, stdin: R) -> Result<Option<(Source, String)>, SourceError>
    where
        E: Fn(&str) -> Option<String>,
        R: Read,
    {
        if let Some(value) = self.secret_unsafe_value.as_ref().filter(|v| !v.is_empty()) {
            return Ok(Some((Source::UnsafeValue, value.clone())));
        }

        if let Some(name) = &self.secret_env {
            if let Some(value) = env(name).filter(|v| !v.is_empty()) {
                return Ok(Some((Source::Env(name.clone()), value)));
            }
        }

        if let Some(path) = &self.secret_file {
            let source = Source::File(path.clone());
            return match std::fs::read_to_string(path) {
                Ok(text) => Ok(Some((source, text))),
                Err(error) => Err(SourceError::Io { source, error }),
            };
        }

        if let Some(fd) = self.secret_fd {
            let source = Source::Fd(fd);
            return match std::fs::read_to_string(format!("/dev/fd/{}", fd)) {
                Ok(text) => Ok(Some((source, text))),
                Err(error) => Err(SourceError::Io { source, error }),
            };
        }

        if self.secret_stdin {
            return read_all(stdin, Source::Stdin).map(Some);
        }

        Ok(None)
    }
}

fn read_all<R: Read>(mut reader: R, source: Source) -> Result<(Source, String), SourceError> {
    let mut text = String::new();
    match reader.read_to_string(&mut text) {
        Ok(_) => Ok((source, text)),
        Err(error) => Err(SourceError::Io { source, error }),
    }
}
