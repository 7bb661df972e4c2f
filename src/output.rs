//! Human and JSON output for tmw commands.
//!
//! With `--json` every command prints exactly one envelope on stdout:
//! `{ schema_version, command, status, data | error, warnings, next_steps }`.
//! Otherwise mutating commands print a short report built from
//! [`HumanOutput`], and errors go to stderr.

use serde::Serialize;

use crate::error::{Error, JsonError, Result};

pub const SCHEMA_VERSION: &str = "tmw.v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Report of a mutating command: a header line, `key: value` facts,
/// warnings and suggested follow-up commands
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

impl<T: Serialize> Envelope<'_, T> {
    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data: Some(data),
            error: None,
            warnings: human.map(|h| h.warnings.clone()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.clone()).unwrap_or_default(),
        }
        .print();
    }

    if let Some(human) = human.filter(|_| !options.quiet) {
        println!("{}", format_human(human));
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        return Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            data: None,
            error: Some(JsonError::from(err)),
            warnings: Vec::new(),
            next_steps,
        }
        .print();
    }

    eprintln!("error: {err}");
    for hint in &next_steps {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = vec![output.header.clone()];
    lines.extend(output.summary.iter().map(|(key, value)| format!("  {key}: {value}")));
    lines.extend(output.warnings.iter().map(|w| format!("warning: {w}")));
    lines.extend(output.next_steps.iter().map(|step| format!("next: {step}")));
    lines.join("\n")
}

/// First non-flag argument, used to label error output before parsing succeeds
pub fn infer_command_name_from_args() -> String {
    std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with('-'))
        .unwrap_or_else(|| "tmw".to_string())
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::NotInitialized(_) => {
            "initialize TaskMaster in this project first (task-master init)".to_string()
        }
        Error::CorruptState { path, .. } => {
            format!("fix or restore {} by hand, then retry", path.display())
        }
        Error::InvalidConfig(_) => "fix .tmw.toml then retry".to_string(),
        Error::NotFound(_) => "tmw list".to_string(),
        Error::AlreadyExists(name) => format!("tmw switch {name}"),
        Error::ExternalToolFailure { .. } => {
            "no pending tasks, or the engine could not run; check [engine] in .tmw.toml".to_string()
        }
        Error::ExternalToolTimeout { .. } => "raise engine.timeout_secs in .tmw.toml".to_string(),
        _ => return Vec::new(),
    };
    vec![step]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_human_layout() {
        let mut human = HumanOutput::new("✅ Created workspace: alpha");
        human.push_summary("tasks file", "/x/tasks.json");
        human.push_warning("reused an existing directory");
        human.push_next_step("tmw switch alpha");

        assert_eq!(
            format_human(&human),
            "✅ Created workspace: alpha\n  tasks file: /x/tasks.json\nwarning: reused an existing directory\nnext: tmw switch alpha"
        );
    }

    #[test]
    fn test_format_human_header_only() {
        let human = HumanOutput::new("done");
        assert_eq!(format_human(&human), "done");
    }

    #[test]
    fn test_error_hints() {
        assert_eq!(error_next_steps(&Error::NotFound("x".into())), ["tmw list"]);
        assert!(error_next_steps(&Error::Protected("default".into())).is_empty());
    }
}
