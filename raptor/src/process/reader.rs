use super::diagnostics;
use super::{reader_args, CliEngine, PipelineState};
use crate::adapter::ParseInput;
use crate::backend::{StatementSource, STREAM_BASE_IRI};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::RaptorError;
use crate::exchange::ExchangeDecoder;
use crate::marshal::DecodingSession;
use crate::syntax::Syntax;
use rio_raptor_api::model::Statement;
use std::collections::VecDeque;
use std::env;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::thread::{self, JoinHandle};

/// A parse done by `rapper`, decoded from its N-Triples or N-Quads output.
pub(crate) struct PipelineSource {
    state: PipelineState,
    child: Option<Child>,
    decoder: Option<ExchangeDecoder<BufReader<ChildStdout>>>,
    feeder: Option<JoinHandle<io::Result<()>>>,
    stderr: Option<File>,
    session: DecodingSession,
    diagnostics: Diagnostics,
}

impl PipelineSource {
    pub(crate) fn start(
        engine: &CliEngine,
        syntax: Syntax,
        base_iri: Option<&str>,
        input: ParseInput,
    ) -> Result<Self, RaptorError> {
        syntax.check_parse()?;
        let (source, feed): (String, Option<Box<dyn Read + Send>>) = match input {
            ParseInput::Iri(iri) => (iri, None),
            ParseInput::File(path) => {
                let path = if path.is_absolute() {
                    path
                } else {
                    env::current_dir()?.join(path)
                };
                if !path.is_file() {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("{} is not a file", path.display()),
                    )
                    .into());
                }
                let path = path.to_str().map(str::to_owned).ok_or_else(|| {
                    RaptorError::argument(format!("unsupported file name {}", path.display()))
                })?;
                (path, None)
            }
            ParseInput::Reader(read) => (STREAM_BASE_IRI.to_owned(), Some(read)),
            ParseInput::Buffer(buffer) => {
                (STREAM_BASE_IRI.to_owned(), Some(Box::new(Cursor::new(buffer))))
            }
        };
        let args = reader_args(syntax, &source, base_iri);
        let stdin = if feed.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let (mut child, stderr) = engine.spawn(&args, stdin)?;
        let feeder = match (feed, child.stdin.take()) {
            (Some(feed), Some(stdin)) => {
                let chunk_size = engine.feeder_chunk_size();
                let spawned = thread::Builder::new()
                    .name("rapper-feeder".to_owned())
                    .spawn(move || feed_process(feed, stdin, chunk_size));
                match spawned {
                    Ok(feeder) => Some(feeder),
                    Err(error) => {
                        kill(&mut child);
                        return Err(error.into());
                    }
                }
            }
            _ => None,
        };
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                kill(&mut child);
                return Err(RaptorError::io_other("rapper stdout is not piped"));
            }
        };
        Ok(Self {
            state: PipelineState::Spawned,
            child: Some(child),
            decoder: Some(ExchangeDecoder::new(
                syntax.exchange(),
                BufReader::with_capacity(engine.chunk_size(), stdout),
            )),
            feeder,
            stderr: Some(stderr),
            session: DecodingSession::new(),
            diagnostics: Diagnostics::default(),
        })
    }

    fn transition(&mut self, state: PipelineState) {
        tracing::debug!("rapper reader {} -> {}", self.state, state);
        self.state = state;
    }

    /// Waits for the process once its output is consumed and reports how it went.
    fn complete(&mut self) -> Result<(), RaptorError> {
        self.transition(PipelineState::Draining);
        self.decoder = None;
        let status = match self.child.take() {
            Some(mut child) => Some(child.wait()?),
            None => None,
        };
        let fed = match self.feeder.take() {
            Some(feeder) => feeder
                .join()
                .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "the rapper feeder panicked"))),
            None => Ok(()),
        };
        if let Some(mut stderr) = self.stderr.take() {
            diagnostics::collect(&mut stderr, &mut self.diagnostics)?;
        }
        self.transition(PipelineState::Closed);
        fed?;
        if let Some(diagnostic) = self.diagnostics.take_error() {
            return Err(diagnostic.into_parse_error());
        }
        match status {
            Some(status) if !status.success() => Err(RaptorError::io_other(format!(
                "rapper exited with {}",
                status
            ))),
            _ => Ok(()),
        }
    }

    /// Stops the process after its output could not be decoded.
    ///
    /// rapper may still be blocked on its input, so it is killed instead of waited
    /// for, and the feeder is left to stop on the broken pipe.
    fn abort(&mut self) -> Option<RaptorError> {
        self.transition(PipelineState::Draining);
        self.decoder = None;
        if let Some(mut child) = self.child.take() {
            kill(&mut child);
        }
        self.feeder = None;
        if let Some(mut stderr) = self.stderr.take() {
            if let Err(error) = diagnostics::collect(&mut stderr, &mut self.diagnostics) {
                tracing::debug!("cannot read the rapper diagnostics: {}", error);
            }
        }
        self.transition(PipelineState::Closed);
        self.diagnostics.take_error().map(Diagnostic::into_parse_error)
    }
}

impl StatementSource for PipelineSource {
    fn step(&mut self, queue: &mut VecDeque<Statement>) -> Result<(), RaptorError> {
        match self.state {
            PipelineState::Closed | PipelineState::Draining => return Ok(()),
            PipelineState::Spawned => self.transition(PipelineState::Streaming),
            PipelineState::Streaming => {}
        }
        let decoder = match &mut self.decoder {
            Some(decoder) => decoder,
            None => return self.complete(),
        };
        if decoder.is_end() {
            return self.complete();
        }
        match decoder.step(&mut self.session, queue) {
            Ok(()) if decoder.is_end() => self.complete(),
            Ok(()) => Ok(()),
            // A broken exchange stream usually means rapper failed: its own report is better.
            Err(error) => Err(self.abort().unwrap_or(error)),
        }
    }

    fn is_end(&self) -> bool {
        self.state == PipelineState::Closed
    }

    fn warnings(&self) -> &[Diagnostic] {
        &self.diagnostics.warnings
    }

    fn prefixes(&self) -> &[(String, String)] {
        &[]
    }

    fn close(&mut self) {
        if self.state == PipelineState::Closed {
            return;
        }
        if let Some(mut child) = self.child.take() {
            kill(&mut child);
        }
        self.decoder = None;
        // The feeder stops on the broken pipe, it is not waited for.
        self.feeder = None;
        self.stderr = None;
        self.transition(PipelineState::Closed);
    }
}

impl Drop for PipelineSource {
    fn drop(&mut self) {
        self.close();
    }
}

pub(super) fn kill(child: &mut Child) {
    if let Err(error) = child.kill() {
        tracing::debug!("cannot kill rapper: {}", error);
    }
    if let Err(error) = child.wait() {
        tracing::debug!("cannot reap rapper: {}", error);
    }
}

/// Copies `source` to the process stdin, then closes it.
///
/// A broken pipe means the process stopped reading: that is for the reader to report.
fn feed_process(
    mut source: Box<dyn Read + Send>,
    mut stdin: ChildStdin,
    chunk_size: usize,
) -> io::Result<()> {
    let mut buffer = vec![0; chunk_size];
    loop {
        let len = match source.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(len) => len,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        };
        tracing::trace!("feeding {} bytes to rapper", len);
        match stdin.write_all(&buffer[..len]) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::BrokenPipe => {
                tracing::trace!("rapper closed its input");
                return Ok(());
            }
            Err(error) => return Err(error),
        }
    }
}
