//! Build-step DSL.
//!
//! Steps are plain data: the graph engine carries them around without
//! looking inside, and [`Dockerfile`](crate::Dockerfile) turns them into
//! instructions. The shortcut functions render the package-install scripts
//! used throughout the image catalog.

use serde::{Deserialize, Serialize};

const TAB: &str = "    ";

/// A single Dockerfile instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Run(String),
    Add {
        src: String,
        #[serde(default)]
        dst: Option<String>,
    },
    Copy {
        src: String,
        dst: String,
        #[serde(default)]
        from: Option<String>,
    },
    Env(Vec<(String, String)>),
    Workdir(String),
    User(String),
    Cmd(Command),
    Entrypoint(Command),
    Shell(Vec<String>),
}

/// Command for `CMD` and `ENTRYPOINT`, in shell or exec form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Shell(String),
    Exec(Vec<String>),
}

impl Command {
    pub fn exec<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command::Exec(args.into_iter().map(Into::into).collect())
    }
}

impl Step {
    pub fn run(cmd: impl Into<String>) -> Self {
        Step::Run(cmd.into())
    }

    /// Add a file to the image root, keeping its file name.
    pub fn add(src: impl Into<String>) -> Self {
        Step::Add {
            src: src.into(),
            dst: None,
        }
    }

    pub fn add_to(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Step::Add {
            src: src.into(),
            dst: Some(dst.into()),
        }
    }

    pub fn copy_from(
        from: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
    ) -> Self {
        Step::Copy {
            src: src.into(),
            dst: dst.into(),
            from: Some(from.into()),
        }
    }

    pub fn env<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Step::Env(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn workdir(dir: impl Into<String>) -> Self {
        Step::Workdir(dir.into())
    }

    pub fn user(name: impl Into<String>) -> Self {
        Step::User(name.into())
    }

    pub fn cmd(cmd: Command) -> Self {
        Step::Cmd(cmd)
    }

    pub fn entrypoint(cmd: Command) -> Self {
        Step::Entrypoint(cmd)
    }

    pub fn shell<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Step::Shell(args.into_iter().map(Into::into).collect())
    }
}

/// Indent every argument by two tabs and join them with line continuations.
fn continued<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| format!("{TAB}{TAB}{}", arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" \\\n")
}

fn with_files<S: AsRef<str>>(flag: &str, packages: &[S], files: &[S]) -> Vec<String> {
    files
        .iter()
        .map(|f| format!("{flag} {}", f.as_ref()))
        .chain(packages.iter().map(|p| p.as_ref().to_string()))
        .collect()
}

/// `apt-get install` command that cleans the package lists afterwards.
pub fn apt<S: AsRef<str>>(packages: &[S]) -> String {
    format!(
        "export DEBIAN_FRONTEND=noninteractive && \\\n\
         {TAB}apt-get update -y -q && \\\n\
         {TAB}apt-get install -y -q \\\n\
         {} && \\\n\
         {TAB}rm -rf /var/lib/apt/lists/*\n",
        continued(packages)
    )
}

pub fn apk<S: AsRef<str>>(packages: &[S]) -> String {
    format!("apk add --no-cache -q \\\n{}\n", continued(packages))
}

/// `pip install`, requirement files first.
pub fn pip<S: AsRef<str>>(packages: &[S], files: &[S]) -> String {
    let args = with_files("-r", packages, files);
    format!("pip install \\\n{}\n", continued(&args))
}

/// `conda install` followed by a cache cleanup, requirement files first.
pub fn conda<S: AsRef<str>>(packages: &[S], files: &[S]) -> String {
    let args = with_files("--file", packages, files);
    format!(
        "conda install -y -q \\\n{} && \\\n{TAB}conda clean -q --all\n",
        continued(&args)
    )
}

/// Symlink each `(link, target)` pair.
pub fn symlink<S: AsRef<str>>(links: &[(S, S)]) -> String {
    links
        .iter()
        .map(|(link, target)| format!("ln -sf {} {}", target.as_ref(), link.as_ref()))
        .collect::<Vec<_>>()
        .join(&format!(" && \\\n{TAB}"))
}

/// `mkdir -p` for the given directories.
pub fn mkdir<S: AsRef<str>>(dirs: &[S]) -> String {
    let dirs: Vec<&str> = dirs.iter().map(AsRef::as_ref).collect();
    format!("mkdir -p {}", dirs.join(" "))
}
