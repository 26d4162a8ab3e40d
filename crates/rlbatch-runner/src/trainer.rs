//! Trainer process invocation.

use rlbatch_core::{JobDescriptor, TrainerConfig};
use serde::{Deserialize, Serialize};
use std::io::{self, PipeWriter};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Builds the command line for one trainer run.
///
/// The trainer is invoked as
/// `<program> <args...> --agent <selector> --config <config_reference>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl TrainerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Run the trainer from `dir` instead of the current directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Full argv for `descriptor`, program first.
    pub fn argv(&self, descriptor: &JobDescriptor) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 5);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv.push("--agent".to_string());
        argv.push(descriptor.agent_kind.selector().to_string());
        argv.push("--config".to_string());
        argv.push(descriptor.config_reference.to_string_lossy().into_owned());
        argv
    }

    /// Printable command line for narration.
    pub fn display(&self, descriptor: &JobDescriptor) -> String {
        self.argv(descriptor).join(" ")
    }

    /// Process builder whose stdout and stderr both write to `output`, so the
    /// reader sees lines in the order the trainer emitted them.
    pub fn build(&self, descriptor: &JobDescriptor, output: &PipeWriter) -> io::Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--agent")
            .arg(descriptor.agent_kind.selector())
            .arg("--config")
            .arg(&descriptor.config_reference)
            // Python trainers block-buffer stdout when it is a pipe.
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::from(output.try_clone()?))
            .stderr(Stdio::from(output.try_clone()?));
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        Ok(cmd)
    }
}

impl From<&TrainerConfig> for TrainerCommand {
    fn from(config: &TrainerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
        }
    }
}
