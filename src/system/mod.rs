pub mod firewall;
pub mod host;
pub mod install;
pub mod package;
pub mod service;

use anyhow::Context;
use std::process::Stdio;
use tokio::process::Command;

/// Runs external programs. The installer only ever talks to the host
/// through this trait.
#[async_trait::async_trait]
pub trait Runner: Send + Sync {
    /// Runs `program` to completion; a non-zero exit status is an error.
    async fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<()>;

    /// Runs `program` and returns its stdout. A non-zero exit status is an error.
    async fn output(&self, program: &str, args: &[&str]) -> anyhow::Result<String>;

    /// Whether `program` can be found on `PATH`.
    async fn exists(&self, program: &str) -> bool;
}

#[derive(Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Default::default()
    }
}

fn describe(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait::async_trait]
impl Runner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<()> {
        let line = describe(program, args);
        log::debug!("exec: {line}");
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Can't start {program}"))?;
        if !status.success() {
            anyhow::bail!("`{line}` exited with {status}");
        }
        Ok(())
    }

    async fn output(&self, program: &str, args: &[&str]) -> anyhow::Result<String> {
        let line = describe(program, args);
        log::debug!("exec: {line}");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Can't start {program}"))?;
        if !output.status.success() {
            anyhow::bail!(
                "`{line}` exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn exists(&self, program: &str) -> bool {
        let Some(path) = std::env::var_os("PATH") else {
            return false;
        };
        for dir in std::env::split_paths(&path) {
            if tokio::fs::metadata(dir.join(program))
                .await
                .map(|m| m.is_file())
                .unwrap_or(false)
            {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::{
        collections::{HashMap, HashSet},
        sync::Mutex,
    };

    /// Records every command instead of running it.
    #[derive(Default)]
    pub(crate) struct RecordingRunner {
        pub available: HashSet<String>,
        pub failing: HashSet<String>,
        pub outputs: HashMap<String, String>,
        pub commands: Mutex<Vec<String>>,
    }

    impl RecordingRunner {
        pub fn with_programs(programs: &[&str]) -> Self {
            Self {
                available: programs.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn fail_on(mut self, line: &str) -> Self {
            self.failing.insert(line.to_string());
            self
        }

        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Runner for RecordingRunner {
        async fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<()> {
            self.output(program, args).await.map(|_| ())
        }

        async fn output(&self, program: &str, args: &[&str]) -> anyhow::Result<String> {
            let line = describe(program, args);
            self.commands.lock().unwrap().push(line.clone());
            if self.failing.contains(&line) {
                anyhow::bail!("`{line}` exited with exit status: 1");
            }
            Ok(self.outputs.get(&line).cloned().unwrap_or_default())
        }

        async fn exists(&self, program: &str) -> bool {
            self.available.contains(program)
        }
    }

    #[tokio::test]
    async fn system_runner_reports_exit_status() {
        let runner = SystemRunner::new();
        assert!(runner.run("sh", &["-c", "exit 0"]).await.is_ok());
        assert!(runner.run("sh", &["-c", "exit 3"]).await.is_err());
        assert_eq!(runner.output("sh", &["-c", "echo hi"]).await.unwrap().trim(), "hi");
        assert!(runner.exists("sh").await);
        assert!(!runner.exists("definitely-not-a-real-program-name").await);

        let err = runner.run("definitely-not-a-real-program-name", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Can't start definitely-not-a-real-program-name");
        assert!(err.downcast_ref::<std::io::Error>().is_some());
    }
}
