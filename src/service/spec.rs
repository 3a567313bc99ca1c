//! Service specification for supervised execution.
//!
//! Defines [`ServiceSpec`]: everything the launcher needs to bring the
//! supervised program up — the entry command, environment overrides, the
//! optional capability probe and one-shot recovery commands, and the env
//! knob for immediate-flush output.
//!
//! The supervised program stays opaque: one argv, two output streams, a pid.
//! Readiness, protocol health, and its internal state are its own business.
//!
//! ## Example
//! ```rust
//! use procvisor::ServiceSpec;
//!
//! let spec = ServiceSpec::new(
//!     "memory",
//!     vec!["python".into(), "-m".into(), "memory_service".into()],
//! )
//! .with_env("SERVICE_PORT", "8443")
//! .with_probe(vec!["python".into(), "-c".into(), "import memory_service".into()])
//! .with_recovery(vec!["pip".into(), "install".into(), "memory-service".into()])
//! .with_flush_env("PYTHONUNBUFFERED");
//!
//! assert_eq!(spec.name(), "memory");
//! assert_eq!(spec.program(), Some("python"));
//! ```

/// Specification of a supervised service instance.
///
/// Cloned into the watchdog so relaunches reuse the original command and
/// environment unchanged.
#[derive(Clone, Debug)]
pub struct ServiceSpec {
    name: String,
    command: Vec<String>,
    env: Vec<(String, String)>,
    probe: Option<Vec<String>>,
    recovery: Option<Vec<String>>,
    flush_env: Option<String>,
}

impl ServiceSpec {
    /// Creates a spec for `name` running `command` (program + arguments).
    ///
    /// The name keys every on-disk artifact (pid record, log files); keep it
    /// filesystem-safe.
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            env: Vec::new(),
            probe: None,
            recovery: None,
            flush_env: None,
        }
    }

    /// Adds an environment override for the child process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the capability probe command run before every launch.
    ///
    /// A probe that exits non-zero triggers the one-shot recovery action
    /// followed by a single re-probe.
    pub fn with_probe(mut self, command: Vec<String>) -> Self {
        self.probe = Some(command);
        self
    }

    /// Sets the one-shot recovery command (an install/setup step) run when
    /// the probe fails.
    pub fn with_recovery(mut self, command: Vec<String>) -> Self {
        self.recovery = Some(command);
        self
    }

    /// Names the environment variable that switches the child to
    /// immediate-flush output (set to `1` when unbuffered mode is on).
    pub fn with_flush_env(mut self, var: impl Into<String>) -> Self {
        self.flush_env = Some(var.into());
        self
    }

    /// Logical service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full entry command (program + arguments).
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// The program, or `None` for an empty command.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Arguments after the program.
    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }

    /// Environment overrides.
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Capability probe command, if configured.
    pub fn probe(&self) -> Option<&[String]> {
        self.probe.as_deref()
    }

    /// Recovery command, if configured.
    pub fn recovery(&self) -> Option<&[String]> {
        self.recovery.as_deref()
    }

    /// Immediate-flush env var name, if configured.
    pub fn flush_env(&self) -> Option<&str> {
        self.flush_env.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_and_args_split_the_command() {
        let spec = ServiceSpec::new("svc", vec!["srv".into(), "--port".into(), "1234".into()]);
        assert_eq!(spec.program(), Some("srv"));
        assert_eq!(spec.args(), ["--port".to_string(), "1234".to_string()]);
    }

    #[test]
    fn empty_command_has_no_program() {
        let spec = ServiceSpec::new("svc", Vec::new());
        assert_eq!(spec.program(), None);
        assert!(spec.args().is_empty());
    }
}
