//! Registrar driver that shells out to Kamailio's control tool.
//!
//! Command templates are split on whitespace into argv and `{username}` /
//! `{password}` are substituted per argument, so no shell ever sees user input.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::credentials::CredentialProvider;

pub const DEFAULT_GET_USER: &str = "kamctl show {username}";
pub const DEFAULT_ADD_USER: &str = "kamctl add {username} {password}";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KamailioConfig {
    pub get_user_cmd: String,
    pub add_user_cmd: String,
    pub timeout: Duration,
}

impl Default for KamailioConfig {
    fn default() -> Self {
        Self {
            get_user_cmd: DEFAULT_GET_USER.to_string(),
            add_user_cmd: DEFAULT_ADD_USER.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KamailioDriver {
    config: KamailioConfig,
}

impl KamailioDriver {
    pub fn new(config: KamailioConfig) -> Self {
        Self { config }
    }

    /// Run a rendered command; `Some(stdout)` only on a zero exit within the timeout.
    async fn run(&self, argv: Vec<String>) -> Option<String> {
        let (program, args) = argv.split_first()?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.config.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                tracing::debug!(program = %program, error = %err, "registrar command failed to start");
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    program = %program,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "registrar command timed out"
                );
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!(
                program = %program,
                code = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "registrar command exited with failure"
            );
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl CredentialProvider for KamailioDriver {
    async fn get_password(&self, account: &str) -> Option<String> {
        let argv = render(&self.config.get_user_cmd, &[("{username}", account)])?;
        let stdout = self.run(argv).await?;
        parse_password(&stdout)
    }

    async fn add_user(&self, account: &str, password: &str) -> bool {
        let Some(argv) = render(
            &self.config.add_user_cmd,
            &[("{username}", account), ("{password}", password)],
        ) else {
            return false;
        };
        self.run(argv).await.is_some()
    }
}

/// Split `template` into argv and substitute placeholders inside each argument.
///
/// Each argument is scanned once, left to right, so placeholder text inside a
/// substituted value is never expanded again. Returns `None` for an empty template.
pub fn render(template: &str, vars: &[(&str, &str)]) -> Option<Vec<String>> {
    let argv: Vec<String> = template
        .split_whitespace()
        .map(|arg| substitute(arg, vars))
        .collect();
    if argv.is_empty() { None } else { Some(argv) }
}

fn substitute(arg: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    'scan: while !rest.is_empty() {
        for (placeholder, value) in vars {
            if !placeholder.is_empty() && rest.starts_with(placeholder) {
                out.push_str(value);
                rest = &rest[placeholder.len()..];
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

/// Extract the password from `kamctl show` output.
///
/// First line whose trimmed form starts with `password:` wins; the value is
/// everything after the first `:`, trimmed.
pub fn parse_password(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("password:"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(get_user: &str, add_user: &str, timeout: Duration) -> KamailioDriver {
        KamailioDriver::new(KamailioConfig {
            get_user_cmd: get_user.to_string(),
            add_user_cmd: add_user.to_string(),
            timeout,
        })
    }

    #[test]
    fn placeholders_stay_inside_one_argument() {
        let argv = render("kamctl add {username} {password}", &[
            ("{username}", "joel"),
            ("{password}", "two words; rm -rf /"),
        ])
        .unwrap();
        assert_eq!(argv, vec!["kamctl", "add", "joel", "two words; rm -rf /"]);
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let argv = render(DEFAULT_ADD_USER, &[("{username}", "x{password}"), ("{password}", "s3cret")]).unwrap();
        assert_eq!(argv, vec!["kamctl", "add", "x{password}", "s3cret"]);

        let argv = render("tool --user={username}:{password}", &[
            ("{username}", "joel"),
            ("{password}", "{username}"),
        ])
        .unwrap();
        assert_eq!(argv, vec!["tool", "--user=joel:{username}"]);
    }

    #[test]
    fn empty_template_renders_nothing() {
        assert_eq!(render("   ", &[]), None);
    }

    #[test]
    fn password_line_is_found_anywhere() {
        let out = "id: 3\n  username: marilyn\n  password: hunter2 \npassword: later\n";
        assert_eq!(parse_password(out).as_deref(), Some("hunter2"));
    }

    #[test]
    fn value_keeps_colons_after_the_first() {
        assert_eq!(parse_password("password: a:b").as_deref(), Some("a:b"));
    }

    #[test]
    fn output_without_password_line_is_none() {
        assert_eq!(parse_password("user not found\n"), None);
        assert_eq!(parse_password(""), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reads_password_from_command_output() {
        let d = driver("echo password: {username}", "true", Duration::from_secs(5));
        assert_eq!(d.get_password("marilyn").await.as_deref(), Some("marilyn"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_means_no_password() {
        let d = driver("false {username}", "false {username} {password}", Duration::from_secs(5));
        assert_eq!(d.get_password("joel").await, None);
        assert!(!d.add_user("joel", "pass").await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_program_means_no_password() {
        let d = driver("fire-no-such-registrar-tool {username}", "true", Duration::from_secs(5));
        assert_eq!(d.get_password("joel").await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let d = driver("sleep 5", "sleep 5", Duration::from_millis(100));
        let started = std::time::Instant::now();
        assert_eq!(d.get_password("joel").await, None);
        assert!(!d.add_user("joel", "pass").await);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn add_user_succeeds_on_zero_exit() {
        let d = driver("true", "true {username} {password}", Duration::from_secs(5));
        assert!(d.add_user("5551234", "s3cret").await);
    }
}
