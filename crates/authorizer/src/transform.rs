//! rewriting a serialized suggestion before it is sent
//!
//! A transformation receives a serialized XML or JSON body and must return a
//! body of the same media type. The program doing the work is external, this
//! crate only invokes it through [Transformer].
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub trait Transformer: Send + Sync {
    fn transform(&self, input: &[u8], transformation: &Path)
        -> Result<Vec<u8>, TransformationError>;
}

#[derive(thiserror::Error, Debug)]
pub enum TransformationError {
    #[error("no transformer available for {}", .0.display())]
    Unavailable(PathBuf),
    #[error("unable to run transformer `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transformation {} failed: {stderr}", .transformation.display())]
    Failed {
        transformation: PathBuf,
        stderr: String,
    },
}

/// Used when nothing was configured, fails every transformation
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableTransformer;

impl Transformer for UnavailableTransformer {
    fn transform(
        &self,
        _input: &[u8],
        transformation: &Path,
    ) -> Result<Vec<u8>, TransformationError> {
        Err(TransformationError::Unavailable(transformation.to_path_buf()))
    }
}

/// Runs an external program, body on stdin, transformed body on stdout
///
/// [CommandTransformer::TRANSFORMATION_TOKEN] in an argument is replaced with the
/// transformation path, e.g. `xsltproc {transformation} -`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTransformer {
    program: String,
    args: Vec<String>,
}

impl CommandTransformer {
    pub const TRANSFORMATION_TOKEN: &'static str = "{transformation}";

    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Whitespace separated program and arguments
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self::new(program, words.collect()))
    }
}

impl Transformer for CommandTransformer {
    #[tracing::instrument(level = "debug", skip(self, input), fields(program = %self.program))]
    fn transform(
        &self,
        input: &[u8],
        transformation: &Path,
    ) -> Result<Vec<u8>, TransformationError> {
        let transformation_arg = transformation.to_string_lossy();
        let args = self
            .args
            .iter()
            .map(|arg| arg.replace(Self::TRANSFORMATION_TOKEN, &transformation_arg));

        let spawn_error = |source| TransformationError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // stdin is fed from its own thread, stdout may fill up before stdin is consumed
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_vec();
            std::thread::spawn(move || stdin.write_all(&input))
        });

        let output = child.wait_with_output().map_err(spawn_error)?;

        // a transformer may exit without reading all of stdin
        if let Some(Ok(Err(error))) = writer.map(std::thread::JoinHandle::join) {
            tracing::debug!(%error, "transformer did not consume its input");
        }

        if !output.status.success() {
            return Err(TransformationError::Failed {
                transformation: transformation.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}
