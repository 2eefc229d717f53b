//! Command line surface of `dotp`.
//!
//! Machine readable output (codes, secrets, URIs) goes to stdout without a trailing newline so it
//! can be piped. Everything meant for a human goes to stderr.

pub mod source;

use std::io::{self, Write};
use std::time::SystemTime;

use clap::{Parser, Subcommand};
use dotp::{derive_code, provisioning_uri, remaining_seconds, validate, Palette, Secret};
use tracing::debug;

use self::source::{SecretArgs, SourceError};

#[derive(Parser)]
#[command(name = "dotp", version)]
#[command(about = "Simple TOTP (Time-based One-time Password) utility")]
#[command(after_help = "\
Examples:
  dotp new > ./mysecret
  dotp uri --account foo@bar --issuer myapp --secret-file ./mysecret
  dotp validate 112233 --secret-env TOTP_SECRET
  pass show 'TOTP/mykey' | dotp get --secret-stdin
  pass show 'TOTP/mykey' | dotp uri --secret-stdin | qrencode -t ANSI")]
pub struct Cli {
    #[command(subcommand)]
    pub action: Option<Action>,

    #[command(flatten)]
    pub secret: SecretArgs,

    /// Account name written in the provisioning URI
    #[arg(long, global = true, default_value = "demo-account")]
    pub account: String,

    /// Issuer written in the provisioning URI
    #[arg(long, global = true, default_value = "demo-app")]
    pub issuer: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Print the current TOTP code
    Get,
    /// Generate a new secret key and print it to standard output
    New,
    /// Print a URI for provisioning an authenticator app
    Uri,
    /// Check a code against the current one
    Validate {
        /// The 6 digit code to check
        code: String,
    },
    /// Show the current code live, with the time it has left
    Watch,
    /// Print the version
    Version,
}

#[derive(Debug)]
pub enum CliError {
    Source(SourceError),
    Secret(dotp::SecretError),
    Io(io::Error),
    /// The code given to `validate` is not the current one.
    InvalidCode,
}

impl std::error::Error for CliError {}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Source(e) => write!(f, "{}", e),
            CliError::Secret(e) => write!(f, "{}", e),
            CliError::Io(e) => write!(f, "Error writing output: {}", e),
            CliError::InvalidCode => write!(f, "Invalid code"),
        }
    }
}

impl From<SourceError> for CliError {
    fn from(e: SourceError) -> Self {
        CliError::Source(e)
    }
}

impl From<dotp::SecretError> for CliError {
    fn from(e: dotp::SecretError) -> Self {
        CliError::Secret(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

/// Actions answered from the loaded secret and a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneShot<'a> {
    Get,
    Uri,
    Validate(&'a str),
}

impl Cli {
    pub fn action(&self) -> Action {
        self.action.clone().unwrap_or(Action::Watch)
    }
}

/// Run the parsed command line against the real terminal.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    let action = cli.action();
    debug!(?action, "dispatching");

    let stdout = io::stdout();
    let stderr = io::stderr();

    let one_shot = match &action {
        Action::New => return run_new(&mut stdout.lock()),
        Action::Version => return run_version(&mut stdout.lock()),
        Action::Watch => {
            let secret = cli.secret.load()?;
            return run_watch(&secret, &mut stderr.lock());
        }
        Action::Get => OneShot::Get,
        Action::Uri => OneShot::Uri,
        Action::Validate { code } => OneShot::Validate(code),
    };

    let secret = cli.secret.load()?;
    run_one_shot(
        cli,
        one_shot,
        &secret,
        SystemTime::now(),
        &mut stdout.lock(),
        &mut stderr.lock(),
    )
}

pub fn run_one_shot<O: Write, E: Write>(
    cli: &Cli,
    action: OneShot<'_>,
    secret: &Secret,
    now: SystemTime,
    out: &mut O,
    err: &mut E,
) -> Result<(), CliError> {
    match action {
        OneShot::Get => {
            write!(out, "{}", derive_code(secret.as_bytes(), now))?;
            out.flush()?;
        }
        OneShot::Uri => {
            let uri = provisioning_uri(&secret.to_encoded(), &cli.account, &cli.issuer);
            write!(out, "{}", uri)?;
            out.flush()?;
        }
        OneShot::Validate(code) => {
            if !validate(secret.as_bytes(), code, now) {
                return Err(CliError::InvalidCode);
            }
            writeln!(
                err,
                "Valid code (expires in {} seconds)",
                remaining_seconds(now)
            )?;
        }
    }
    Ok(())
}

pub fn run_new<O: Write>(out: &mut O) -> Result<(), CliError> {
    let secret = dotp::generate()?;
    write!(out, "{}", secret)?;
    out.flush()?;
    Ok(())
}

pub fn run_version<O: Write>(out: &mut O) -> Result<(), CliError> {
    write!(out, "{}", env!("CARGO_PKG_VERSION"))?;
    out.flush()?;
    Ok(())
}

fn write_banner<E: Write>(err: &mut E, palette: &Palette) -> io::Result<()> {
    writeln!(err, "{}Press Ctrl+C to exit{}", palette.neutral, palette.reset)?;
    writeln!(err, "Your TOTP code is:")?;
    err.flush()
}

/// Print the banner on stderr and hand the terminal to the live renderer.
fn run_watch<E: Write>(secret: &Secret, err: &mut E) -> Result<(), CliError> {
    write_banner(err, &Palette::detect())?;

    match dotp::watch(secret) {
        Ok(never) => match never {},
        Err(e) => Err(CliError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    const SEED_B32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn seed() -> Secret {
        Secret::from_base32(SEED_B32).unwrap()
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn run_at(cli: &Cli, secs: u64) -> (Result<(), CliError>, String, String) {
        run_with(cli, &seed(), secs)
    }

    fn run_with(cli: &Cli, secret: &Secret, secs: u64) -> (Result<(), CliError>, String, String) {
        let action = cli.action();
        let one_shot = match &action {
            Action::Get => OneShot::Get,
            Action::Uri => OneShot::Uri,
            Action::Validate { code } => OneShot::Validate(code),
            other => panic!("{:?} is not answered from a single instant", other),
        };
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = run_one_shot(cli, one_shot, secret, at(secs), &mut out, &mut err);
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn default_action_is_watch() {
        let cli = parse(&["dotp"]);
        assert_eq!(cli.action, None);
        assert_eq!(cli.action(), Action::Watch);
        assert_eq!(cli.account, "demo-account");
        assert_eq!(cli.issuer, "demo-app");
    }

    #[test]
    fn options_after_action() {
        let cli = parse(&[
            "dotp",
            "validate",
            "112233",
            "--secret-env",
            "TOTP_SECRET",
        ]);
        assert_eq!(
            cli.action(),
            Action::Validate {
                code: "112233".to_string()
            }
        );
        assert_eq!(cli.secret.secret_env.as_deref(), Some("TOTP_SECRET"));
    }

    #[test]
    fn options_before_action() {
        let cli = parse(&["dotp", "--secret-stdin", "--issuer", "myapp", "uri"]);
        assert_eq!(cli.action(), Action::Uri);
        assert!(cli.secret.secret_stdin);
        assert_eq!(cli.issuer, "myapp");
    }

    #[test]
    fn secret_fd_must_be_a_number() {
        assert!(Cli::try_parse_from(["dotp", "get", "--secret-fd", "three"]).is_err());
        let cli = parse(&["dotp", "get", "--secret-fd", "3"]);
        assert_eq!(cli.secret.secret_fd, Some(3));
    }

    #[test]
    fn validate_requires_code() {
        assert!(Cli::try_parse_from(["dotp", "validate"]).is_err());
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(Cli::try_parse_from(["dotp", "frobnicate"]).is_err());
    }

    #[test]
    fn get_prints_code_without_newline() {
        let (result, out, err) = run_at(&parse(&["dotp", "get"]), 59);
        assert!(result.is_ok());
        assert_eq!(out, "287082");
        assert_eq!(err, "");
    }

    #[test]
    fn uri_uses_account_and_issuer() {
        let cli = parse(&["dotp", "uri", "--account", "foo@bar", "--issuer", "myapp"]);
        let (result, out, _) = run_at(&cli, 59);
        assert!(result.is_ok());
        assert_eq!(
            out,
            "otpauth://totp/myapp:foo%40bar?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&issuer=myapp"
        );
    }

    #[test]
    fn uri_secret_has_no_padding() {
        let secret = Secret::from(b"TestSecretSuperSecret".to_vec());
        let cli = parse(&["dotp", "uri", "--account", "a", "--issuer", "b"]);
        let (result, out, _) = run_with(&cli, &secret, 0);
        assert!(result.is_ok());
        assert!(!out.contains("%3D"));
        assert_eq!(
            out,
            "otpauth://totp/b:a?secret=KRSXG5CTMVRXEZLUKN2XAZLSKNSWG4TFOQ&issuer=b"
        );
    }

    #[test]
    fn banner_follows_palette() {
        let mut err = Vec::new();
        write_banner(&mut err, &Palette::ansi()).unwrap();
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "\x1b[0;97mPress Ctrl+C to exit\x1b[0;39m\nYour TOTP code is:\n"
        );

        let mut err = Vec::new();
        write_banner(&mut err, &Palette::plain()).unwrap();
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "Press Ctrl+C to exit\nYour TOTP code is:\n"
        );
    }

    #[test]
    fn uri_defaults() {
        let (_, out, _) = run_at(&parse(&["dotp", "uri"]), 0);
        assert!(out.starts_with("otpauth://totp/demo-app:demo-account?secret="));
        assert!(out.ends_with("&issuer=demo-app"));
    }

    #[test]
    fn validate_accepts_current_code() {
        let (result, out, err) = run_at(&parse(&["dotp", "validate", "287082"]), 45);
        assert!(result.is_ok());
        assert_eq!(out, "");
        assert_eq!(err, "Valid code (expires in 15 seconds)\n");
    }

    #[test]
    fn validate_rejects_other_code() {
        let (result, _, err) = run_at(&parse(&["dotp", "validate", "287082"]), 60);
        assert!(matches!(result, Err(CliError::InvalidCode)));
        assert_eq!(err, "");
        assert_eq!(CliError::InvalidCode.to_string(), "Invalid code");
    }

    #[test]
    fn new_prints_fresh_secret() {
        let mut out = Vec::new();
        run_new(&mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.len(), 16);
        assert_eq!(
            dotp::decode(&printed).unwrap().len(),
            dotp::GENERATED_SECRET_LEN
        );
    }

    #[test]
    fn version_matches_package() {
        let mut out = Vec::new();
        run_version(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), env!("CARGO_PKG_VERSION"));
    }
}
