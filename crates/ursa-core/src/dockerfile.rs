//! Dockerfile rendering.

use crate::steps::{Command, Step};
use std::fmt;
use std::path::Path;

/// An in-memory Dockerfile assembled from build steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dockerfile {
    from: String,
    instructions: Vec<String>,
}

impl Dockerfile {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            instructions: Vec::new(),
        }
    }

    /// Build a Dockerfile from a base image and a sequence of steps.
    pub fn from_steps<'a>(from: impl Into<String>, steps: impl IntoIterator<Item = &'a Step>) -> Self {
        let mut dockerfile = Self::new(from);
        for step in steps {
            dockerfile.push(step);
        }
        dockerfile
    }

    pub fn push(&mut self, step: &Step) {
        self.instructions.push(render(step));
    }
}

fn render(step: &Step) -> String {
    match step {
        Step::Run(cmd) => format!("RUN {}", cmd.trim_end()),
        Step::Add { src, dst } => {
            let dst = match dst {
                Some(dst) => dst.clone(),
                None => {
                    let file_name = Path::new(src)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| src.clone());
                    format!("/{file_name}")
                }
            };
            format!("ADD {src} {dst}")
        }
        Step::Copy { src, dst, from } => match from {
            Some(from) => format!("COPY --from={from} {src} {dst}"),
            None => format!("COPY {src} {dst}"),
        },
        Step::Env(vars) => {
            let vars: Vec<String> = vars.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("ENV {}", vars.join(" \\\n    "))
        }
        Step::Workdir(dir) => format!("WORKDIR {dir}"),
        Step::User(user) => format!("USER {user}"),
        Step::Cmd(cmd) => format!("CMD {}", render_command(cmd)),
        Step::Entrypoint(cmd) => format!("ENTRYPOINT {}", render_command(cmd)),
        Step::Shell(args) => format!("SHELL {}", exec_form(args)),
    }
}

fn render_command(cmd: &Command) -> String {
    match cmd {
        Command::Shell(cmd) => cmd.clone(),
        Command::Exec(args) => exec_form(args),
    }
}

fn exec_form(args: &[String]) -> String {
    // Serializing a list of strings cannot fail.
    serde_json::to_string(args).unwrap_or_default()
}

impl fmt::Display for Dockerfile {
    /// `RUN` instructions are followed by a blank line, everything else is
    /// written one instruction per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FROM {}", self.from)?;
        writeln!(f)?;
        let last = self.instructions.len().saturating_sub(1);
        for (idx, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{instruction}")?;
            if instruction.starts_with("RUN ") && idx != last {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
