//! Scripted stand-ins for `rapper`.
#![allow(dead_code)]

use rio_raptor::{BackendKind, Engine, RaptorConfig};
use std::fs;
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::OnceLock;
use tempfile::TempDir;

/// Copies its input to its output, like `rapper` does between N-Triples documents.
const IDENTITY: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "2.0.15"
    exit 0
fi
src=""
while [ $# -gt 0 ]; do
    case "$1" in
        -q) shift ;;
        -i|-o|-f) shift 2 ;;
        *) src="$1"; break ;;
    esac
done
case "$src" in
    file:///dev/stdin) exec cat ;;
    /*) exec cat "$src" ;;
    *)
        echo "rapper: Error - URI $src - cannot retrieve the document" >&2
        exit 1
        ;;
esac
"#;

/// Reads everything, outputs one statement, then reports a located error.
const FAILING: &str = r#"#!/bin/sh
cat > /dev/null
echo '<http://e/a> <http://e/b> <http://e/c> .'
echo 'rapper: Warning - URI file:///dev/stdin:1 - unexpected character' >&2
echo 'rapper: Error - URI file:///dev/stdin:3 column 5 - syntax error' >&2
exit 1
"#;

/// Fails without reading its input.
const EARLY_FAILING: &str = r#"#!/bin/sh
echo 'rapper: Error - URI file:///dev/stdin:1 column 1 - cannot parse' >&2
exit 1
"#;

/// Fails without saying why.
const CRASHING: &str = r#"#!/bin/sh
cat > /dev/null
exit 3
"#;

/// Writes something that is not N-Triples, then hangs without reading its input.
const GARBLING: &str = r#"#!/bin/sh
echo 'this is not a statement'
exec sleep 600
"#;

/// Like `GARBLING` but explains itself first.
const GARBLING_WITH_ERROR: &str = r#"#!/bin/sh
echo 'rapper: Error - URI file:///dev/stdin:2 column 7 - bad output' >&2
echo 'this is not a statement'
exec sleep 600
"#;

static SCRIPTS: OnceLock<TempDir> = OnceLock::new();

pub fn rapper(name: &str) -> PathBuf {
    let directory = SCRIPTS.get_or_init(|| {
        let directory = tempfile::tempdir().unwrap();
        for (name, script) in [
            ("identity", IDENTITY),
            ("failing", FAILING),
            ("early-failing", EARLY_FAILING),
            ("crashing", CRASHING),
            ("garbling", GARBLING),
            ("garbling-with-error", GARBLING_WITH_ERROR),
        ] {
            let path = directory.path().join(name);
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        directory
    });
    directory.path().join(name)
}

pub fn cli_config(name: &str) -> RaptorConfig {
    RaptorConfig::new()
        .backend(BackendKind::Cli)
        .rapper_path(rapper(name))
}

pub fn cli_engine(name: &str) -> Engine {
    Engine::new(&cli_config(name)).unwrap()
}

/// The native engine, if `libraptor2` can be loaded here.
pub fn native_engine() -> Option<Engine> {
    match Engine::new(&RaptorConfig::new().backend(BackendKind::Native)) {
        Ok(engine) => Some(engine),
        Err(error) => {
            eprintln!("skipping, libraptor2 is not available: {}", error);
            None
        }
    }
}

/// Never ending N-Triples.
pub struct Endless {
    position: usize,
}

impl Endless {
    const LINE: &'static [u8] = b"<http://e/a> <http://e/b> <http://e/c> .\n";

    pub fn new() -> Self {
        Self { position: 0 }
    }
}

impl Read for Endless {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        for byte in buffer.iter_mut() {
            *byte = Self::LINE[self.position];
            self.position = (self.position + 1) % Self::LINE.len();
        }
        Ok(buffer.len())
    }
}
