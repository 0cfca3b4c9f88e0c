//! Access to the engine through the `rapper` utility run as a subprocess.

mod diagnostics;
mod reader;
mod writer;

pub(crate) use reader::PipelineSource;
pub(crate) use writer::PipelineSink;

use crate::config::RaptorConfig;
use crate::error::RaptorError;
use crate::syntax::Syntax;
use crate::version::Version;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Lifecycle of a `rapper` subprocess bound to a reader or a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipelineState {
    /// The process is started, nothing was exchanged yet.
    Spawned,
    /// Statements flow through the process.
    Streaming,
    /// The input is closed, the remaining output is being collected.
    Draining,
    /// The process is reaped.
    Closed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineState::Spawned => "spawned",
            PipelineState::Streaming => "streaming",
            PipelineState::Draining => "draining",
            PipelineState::Closed => "closed",
        })
    }
}

/// A located `rapper` executable.
#[derive(Debug, Clone)]
pub(crate) struct CliEngine {
    rapper: PathBuf,
    chunk_size: usize,
    feeder_chunk_size: usize,
}

impl CliEngine {
    pub(crate) fn probe(config: &RaptorConfig) -> Result<Self, RaptorError> {
        let rapper = config.resolve_rapper().ok_or_else(|| {
            RaptorError::unavailable("the rapper executable was not found")
        })?;
        tracing::debug!("using {}", rapper.display());
        Ok(Self {
            rapper,
            chunk_size: config.get_chunk_size(),
            feeder_chunk_size: config.get_feeder_chunk_size(),
        })
    }

    pub(crate) fn rapper(&self) -> &Path {
        &self.rapper
    }

    pub(crate) fn is_available(&self) -> bool {
        self.rapper.is_file()
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub(crate) fn feeder_chunk_size(&self) -> usize {
        self.feeder_chunk_size
    }

    /// Runs `rapper --version`.
    pub(crate) fn version(&self) -> Result<Version, RaptorError> {
        let output = Command::new(&self.rapper)
            .arg("--version")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| RaptorError::unavailable(format!("cannot run {}: {}", self.rapper.display(), e)))?;
        if !output.status.success() {
            return Err(RaptorError::io_other(format!(
                "{} --version exited with {}",
                self.rapper.display(),
                output.status
            )));
        }
        String::from_utf8_lossy(&output.stdout).parse()
    }

    /// Starts `rapper` with the given arguments.
    ///
    /// stdout is piped. stderr goes to an anonymous temporary file so that
    /// diagnostics can never block the process.
    pub(crate) fn spawn(&self, args: &[OsString], stdin: Stdio) -> Result<(Child, File), RaptorError> {
        let stderr = tempfile::tempfile()?;
        tracing::debug!("spawning {} {:?}", self.rapper.display(), args);
        let child = Command::new(&self.rapper)
            .args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(stderr.try_clone()?)
            .spawn()
            .map_err(|e| RaptorError::unavailable(format!("cannot run {}: {}", self.rapper.display(), e)))?;
        Ok((child, stderr))
    }
}

/// `rapper -q -i <syntax> -o <exchange> <source> [<base>]`
pub(crate) fn reader_args(syntax: Syntax, source: &str, base_iri: Option<&str>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-q".into(),
        "-i".into(),
        syntax.name().into(),
        "-o".into(),
        syntax.exchange().name().into(),
        source.into(),
    ];
    args.extend(base_iri.map(OsString::from));
    args
}

/// `rapper -q -i <exchange> -o <syntax> [-f xmlns:p="iri"]* file:///dev/stdin [<base>]`
pub(crate) fn writer_args(
    syntax: Syntax,
    prefixes: &[(String, String)],
    base_iri: Option<&str>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-q".into(),
        "-i".into(),
        syntax.exchange().name().into(),
        "-o".into(),
        syntax.name().into(),
    ];
    for (prefix, iri) in prefixes {
        args.push("-f".into());
        args.push(format!("xmlns:{}=\"{}\"", prefix, iri).into());
    }
    args.push(crate::backend::STREAM_BASE_IRI.into());
    args.extend(base_iri.map(OsString::from));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_command_line() {
        assert_eq!(
            reader_args(Syntax::Turtle, "file:///dev/stdin", Some("http://e/")),
            ["-q", "-i", "turtle", "-o", "ntriples", "file:///dev/stdin", "http://e/"]
                .iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
        assert_eq!(reader_args(Syntax::TriG, "/tmp/a.trig", None)[4], "nquads");
    }

    #[test]
    fn writer_command_line() {
        assert_eq!(
            writer_args(
                Syntax::RdfXml,
                &[("ex".to_owned(), "http://example.com/".to_owned())],
                None
            ),
            [
                "-q",
                "-i",
                "ntriples",
                "-o",
                "rdfxml",
                "-f",
                "xmlns:ex=\"http://example.com/\"",
                "file:///dev/stdin"
            ]
            .iter()
            .map(OsString::from)
            .collect::<Vec<_>>()
        );
    }
}
