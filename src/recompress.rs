use crate::errors::CompressionError;
use serde::Deserialize;
use std::{
    io,
    io::Write,
    process::{Command, Stdio},
    thread,
};
use tracing::debug;

/// Where generated images get optimised.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The `oxipng` crate, in this process.
    Library,
    /// An external program reading the image on stdin and writing the
    /// optimised image to stdout.
    #[default]
    Process,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recompressor {
    pub backend: Backend,
    /// `oxipng` preset (0-6) for the library backend.
    pub level: u8,
    pub program: String,
    pub args: Vec<String>,
}

pub const MAX_LEVEL: u8 = 6;

impl Default for Recompressor {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            level: MAX_LEVEL,
            program: "oxipng".to_string(),
            args: ["-o6", "-q", "--stdout", "-"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Recompressor {
    pub fn run(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let output = match self.backend {
            Backend::Library => self.optimize(data)?,
            Backend::Process => self.spawn(data)?,
        };
        debug!(before = data.len(), after = output.len(), "recompressed");
        Ok(output)
    }

    fn optimize(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let options = oxipng::Options::from_preset(self.level.min(MAX_LEVEL));
        Ok(oxipng::optimize_from_memory(data, &options)?)
    }

    fn spawn(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let spawn_error = |source| CompressionError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(spawn_error)?;

        // stdin is fed from another thread while stdout drains.
        let mut stdin = child.stdin.take().ok_or_else(|| {
            spawn_error(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stdin not captured",
            ))
        })?;
        let output = thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(data));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::ErrorKind::BrokenPipe.into()));
            output.and_then(|output| written.map(|()| output))
        })
        .map_err(spawn_error)?;

        if !output.status.success() {
            return Err(CompressionError::Exit {
                program: self.program.clone(),
                status: output.status,
            });
        }
        if output.stdout.is_empty() {
            return Err(CompressionError::EmptyOutput {
                program: self.program.clone(),
            });
        }
        Ok(output.stdout)
    }
}
