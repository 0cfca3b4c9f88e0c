use super::diagnostics;
use super::reader::kill;
use super::{writer_args, CliEngine, PipelineState};
use crate::backend::StatementSink;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::RaptorError;
use crate::exchange::encode_line;
use crate::syntax::Syntax;
use rio_raptor_api::model::Statement;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

type Chunk = io::Result<Vec<u8>>;

/// A serialization done by `rapper`, fed with N-Triples or N-Quads.
pub(crate) struct PipelineSink<W: Write> {
    state: PipelineState,
    syntax: Syntax,
    write: Option<W>,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    output: Option<Receiver<Chunk>>,
    pump: Option<JoinHandle<()>>,
    stderr: Option<File>,
    diagnostics: Diagnostics,
}

impl<W: Write> PipelineSink<W> {
    pub(crate) fn start(
        engine: &CliEngine,
        syntax: Syntax,
        base_iri: Option<&str>,
        prefixes: &[(String, String)],
        write: W,
    ) -> Result<Self, RaptorError> {
        syntax.check_serialize()?;
        let args = writer_args(syntax, prefixes, base_iri);
        let (mut child, stderr) = engine.spawn(&args, Stdio::piped())?;
        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                kill(&mut child);
                return Err(RaptorError::io_other("rapper standard streams are not piped"));
            }
        };
        let (sender, receiver) = mpsc::channel();
        let chunk_size = engine.chunk_size();
        let pump = match thread::Builder::new()
            .name("rapper-pump".to_owned())
            .spawn(move || pump_output(stdout, chunk_size, &sender))
        {
            Ok(pump) => pump,
            Err(error) => {
                kill(&mut child);
                return Err(error.into());
            }
        };
        Ok(Self {
            state: PipelineState::Spawned,
            syntax,
            write: Some(write),
            child: Some(child),
            stdin: Some(BufWriter::with_capacity(engine.feeder_chunk_size(), stdin)),
            output: Some(receiver),
            pump: Some(pump),
            stderr: Some(stderr),
            diagnostics: Diagnostics::default(),
        })
    }

    fn transition(&mut self, state: PipelineState) {
        tracing::debug!("rapper writer {} -> {}", self.state, state);
        self.state = state;
    }

    /// Moves the output produced so far to the destination, without blocking.
    fn drain(&mut self) -> Result<(), RaptorError> {
        let (output, write) = match (&self.output, &mut self.write) {
            (Some(output), Some(write)) => (output, write),
            _ => return Ok(()),
        };
        loop {
            match output.try_recv() {
                Ok(chunk) => write.write_all(&chunk?)?,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
    }

    /// Turns a failed write to the process into the reason the process gave.
    fn input_error(&mut self, error: io::Error) -> RaptorError {
        if error.kind() != io::ErrorKind::BrokenPipe {
            return error.into();
        }
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            if let Err(error) = child.wait() {
                tracing::debug!("cannot reap rapper: {}", error);
            }
        }
        self.collect_diagnostics()
            .err()
            .unwrap_or_else(|| RaptorError::io_other("rapper stopped reading its input"))
    }

    fn collect_diagnostics(&mut self) -> Result<(), RaptorError> {
        if let Some(mut stderr) = self.stderr.take() {
            diagnostics::collect(&mut stderr, &mut self.diagnostics)?;
        }
        match self.diagnostics.take_error() {
            Some(diagnostic) => Err(diagnostic.into_serialize_error()),
            None => Ok(()),
        }
    }

    fn stdin(&mut self) -> Result<&mut BufWriter<ChildStdin>, RaptorError> {
        self.stdin
            .as_mut()
            .ok_or_else(|| RaptorError::io_other("the rapper writer is closed"))
    }
}

impl<W: Write> StatementSink<W> for PipelineSink<W> {
    fn format(&mut self, statement: &Statement) -> Result<(), RaptorError> {
        if self.state == PipelineState::Spawned {
            self.transition(PipelineState::Streaming);
        }
        self.drain()?;
        let exchange = self.syntax.exchange();
        let mut line = Vec::new();
        encode_line(statement, exchange, &mut line)?;
        let written = self.stdin()?.write_all(&line);
        if let Err(error) = written {
            return Err(self.input_error(error));
        }
        self.drain()
    }

    fn flush(&mut self) -> Result<(), RaptorError> {
        let flushed = self.stdin()?.flush();
        if let Err(error) = flushed {
            return Err(self.input_error(error));
        }
        self.drain()?;
        if let Some(write) = &mut self.write {
            write.flush()?;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<W, RaptorError> {
        self.transition(PipelineState::Draining);
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(error) = stdin.flush() {
                return Err(self.input_error(error));
            }
        }
        if let (Some(output), Some(write)) = (self.output.take(), &mut self.write) {
            for chunk in output {
                write.write_all(&chunk?)?;
            }
        }
        if let Some(pump) = self.pump.take() {
            if pump.join().is_err() {
                return Err(RaptorError::io_other("the rapper output pump panicked"));
            }
        }
        let status = match self.child.take() {
            Some(mut child) => Some(child.wait()?),
            None => None,
        };
        self.transition(PipelineState::Closed);
        self.collect_diagnostics()?;
        if let Some(status) = status {
            if !status.success() {
                return Err(RaptorError::io_other(format!("rapper exited with {}", status)));
            }
        }
        let mut write = self
            .write
            .take()
            .ok_or_else(|| RaptorError::io_other("the rapper writer is closed"))?;
        write.flush()?;
        Ok(write)
    }

    fn warnings(&self) -> &[Diagnostic] {
        &self.diagnostics.warnings
    }
}

impl<W: Write> Drop for PipelineSink<W> {
    fn drop(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            kill(&mut child);
        }
        // The pump ends with the closed stdout.
        self.output = None;
        self.pump = None;
        self.state = PipelineState::Closed;
    }
}

/// Forwards the process output to the channel until it is closed.
fn pump_output(mut stdout: ChildStdout, chunk_size: usize, sender: &mpsc::Sender<Chunk>) {
    let mut buffer = vec![0; chunk_size];
    loop {
        let chunk = match stdout.read(&mut buffer) {
            Ok(0) => return,
            Ok(len) => Ok(buffer[..len].to_vec()),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => Err(error),
        };
        let failed = chunk.is_err();
        if sender.send(chunk).is_err() || failed {
            return;
        }
    }
}
