use super::ffi::*;
use super::world::{NativeEngine, WorldGuard};
use crate::error::RaptorError;
use std::any::Any;
use std::io::{self, Read, Write};
use std::os::raw::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::slice;

/// The state the engine byte callbacks work on.
///
/// It stays boxed for the whole life of the native iostream: the engine keeps
/// pointers to both the handler table and the shim itself.
struct Shim<S> {
    handler: raptor_iostream_handler,
    target: Option<S>,
    error: Option<io::Error>,
    panic: Option<Box<dyn Any + Send>>,
    eof: bool,
}

impl<S> Shim<S> {
    fn new(target: S, handler: raptor_iostream_handler) -> Box<Self> {
        Box::new(Self {
            handler,
            target: Some(target),
            error: None,
            panic: None,
            eof: false,
        })
    }

    /// The pointer handed to the engine as the callbacks' context.
    fn context(&mut self) -> *mut c_void {
        self as *mut Self as *mut c_void
    }

    fn fail(&mut self, error: io::Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn target(&mut self) -> io::Result<&mut S> {
        self.target
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "the stream is closed"))
    }
}

/// A `raptor_iostream` reading from or writing to a Rust value.
pub(crate) struct IoStream<S> {
    engine: &'static NativeEngine,
    ptr: Option<NonNull<raptor_iostream>>,
    shim: Box<Shim<S>>,
}

impl<W: Write> IoStream<W> {
    pub(crate) fn writer(guard: &WorldGuard<'_>, engine: &'static NativeEngine, target: W) -> Result<Self, RaptorError> {
        Self::new(guard, engine, Shim::new(target, writer_handler::<W>()))
    }
}

impl<R: Read> IoStream<R> {
    pub(crate) fn reader(guard: &WorldGuard<'_>, engine: &'static NativeEngine, source: R) -> Result<Self, RaptorError> {
        Self::new(guard, engine, Shim::new(source, reader_handler::<R>()))
    }
}

fn writer_handler<W: Write>() -> raptor_iostream_handler {
    raptor_iostream_handler {
        version: 2,
        init: None,
        finish: None,
        write_byte: Some(write_byte::<W>),
        write_bytes: Some(write_bytes::<W>),
        write_end: Some(write_end::<W>),
        read_bytes: None,
        read_eof: None,
    }
}

fn reader_handler<R: Read>() -> raptor_iostream_handler {
    raptor_iostream_handler {
        version: 2,
        init: None,
        finish: None,
        write_byte: None,
        write_bytes: None,
        write_end: None,
        read_bytes: Some(read_bytes::<R>),
        read_eof: Some(read_eof::<R>),
    }
}

impl<S> IoStream<S> {
    fn new(
        guard: &WorldGuard<'_>,
        engine: &'static NativeEngine,
        mut shim: Box<Shim<S>>,
    ) -> Result<Self, RaptorError> {
        let context = shim.context();
        // SAFETY: the box is neither moved nor dropped before the iostream is freed.
        let ptr = unsafe {
            (guard.api().new_iostream_from_handler)(
                guard.world(),
                context,
                &shim.handler,
            )
        };
        let ptr = NonNull::new(ptr)
            .ok_or_else(|| RaptorError::io_other("raptor_new_iostream_from_handler failed"))?;
        Ok(Self {
            engine,
            ptr: Some(ptr),
            shim,
        })
    }

    pub(crate) fn as_ptr(&self) -> *mut raptor_iostream {
        self.ptr.map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    /// Returns the first IO error a callback hit since the last call, resuming
    /// any panic raised by the Rust side of the stream.
    pub(crate) fn take_error(&mut self) -> Option<io::Error> {
        if let Some(payload) = self.shim.panic.take() {
            panic::resume_unwind(payload);
        }
        self.shim.error.take()
    }

    fn release(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            let guard = self.engine.lock();
            // SAFETY: the iostream is owned and freed once, under the lock.
            unsafe { (guard.api().free_iostream)(ptr.as_ptr()) }
        }
    }

    /// Frees the native stream and gives the Rust value back.
    pub(crate) fn into_inner(mut self) -> Result<S, io::Error> {
        self.release();
        if let Some(error) = self.take_error() {
            return Err(error);
        }
        self.shim
            .target
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "the stream is closed"))
    }
}

impl<S> Drop for IoStream<S> {
    fn drop(&mut self) {
        self.release();
    }
}

unsafe fn shim<'a, S>(context: *mut c_void) -> &'a mut Shim<S> {
    &mut *(context as *mut Shim<S>)
}

fn guarded<S, T>(shim: &mut Shim<S>, failure: T, f: impl FnOnce(&mut Shim<S>) -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(|| f(shim))) {
        Ok(value) => value,
        Err(payload) => {
            shim.panic = Some(payload);
            failure
        }
    }
}

unsafe extern "C" fn write_byte<W: Write>(context: *mut c_void, byte: c_int) -> c_int {
    let shim = shim::<W>(context);
    guarded(shim, 1, |shim| {
        // Raptor passes the byte as an int, only its low 8 bits are meaningful.
        match shim.target().and_then(|t| t.write_all(&[byte as u8])) {
            Ok(()) => 0,
            Err(error) => {
                shim.fail(error);
                1
            }
        }
    })
}

unsafe extern "C" fn write_bytes<W: Write>(
    context: *mut c_void,
    ptr: *const c_void,
    size: usize,
    nmemb: usize,
) -> c_int {
    let shim = shim::<W>(context);
    let len = size.saturating_mul(nmemb);
    if len == 0 || ptr.is_null() {
        return 0;
    }
    let bytes = slice::from_raw_parts(ptr as *const u8, len);
    guarded(shim, -1, |shim| match shim.target().and_then(|t| t.write_all(bytes)) {
        Ok(()) => c_int::try_from(nmemb).unwrap_or(c_int::MAX),
        Err(error) => {
            shim.fail(error);
            -1
        }
    })
}

unsafe extern "C" fn write_end<W: Write>(context: *mut c_void) -> c_int {
    let shim = shim::<W>(context);
    guarded(shim, 1, |shim| match shim.target().and_then(|t| t.flush()) {
        Ok(()) => 0,
        Err(error) => {
            shim.fail(error);
            1
        }
    })
}

unsafe extern "C" fn read_bytes<R: Read>(
    context: *mut c_void,
    ptr: *mut c_void,
    size: usize,
    nmemb: usize,
) -> c_int {
    let shim = shim::<R>(context);
    if size == 0 || ptr.is_null() {
        return 0;
    }
    let capacity = size.saturating_mul(nmemb).min(c_int::MAX as usize);
    let buffer = slice::from_raw_parts_mut(ptr as *mut u8, capacity - capacity % size);
    guarded(shim, -1, |shim| {
        let mut filled = 0;
        while filled < buffer.len() {
            match shim.target().and_then(|t| t.read(&mut buffer[filled..])) {
                Ok(0) => {
                    shim.eof = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    shim.fail(error);
                    return -1;
                }
            }
            if filled >= size && filled % size == 0 {
                break;
            }
        }
        c_int::try_from(filled / size).unwrap_or(c_int::MAX)
    })
}

unsafe extern "C" fn read_eof<R: Read>(context: *mut c_void) -> c_int {
    c_int::from(shim::<R>(context).eof)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Write for Failing {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "cannot flush"))
        }
    }

    struct Panicking;

    impl Write for Panicking {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            panic!("writer panicked")
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Hands out at most three bytes per read.
    struct Trickle(io::Cursor<&'static [u8]>);

    impl Read for Trickle {
        fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            let len = buffer.len().min(3);
            self.0.read(&mut buffer[..len])
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    fn write<W: Write>(shim: &mut Shim<W>, bytes: &[u8], size: usize) -> c_int {
        let write_bytes = shim.handler.write_bytes.unwrap();
        let context = shim.context();
        unsafe { write_bytes(context, bytes.as_ptr() as *const c_void, size, bytes.len() / size) }
    }

    fn read<R: Read>(shim: &mut Shim<R>, buffer: &mut [u8]) -> c_int {
        let read_bytes = shim.handler.read_bytes.unwrap();
        let context = shim.context();
        unsafe { read_bytes(context, buffer.as_mut_ptr() as *mut c_void, 1, buffer.len()) }
    }

    fn at_eof<R: Read>(shim: &mut Shim<R>) -> bool {
        let read_eof = shim.handler.read_eof.unwrap();
        let context = shim.context();
        unsafe { read_eof(context) != 0 }
    }

    #[test]
    fn writes_reach_the_target() {
        let mut shim = Shim::new(Vec::new(), writer_handler::<Vec<u8>>());
        let write_byte = shim.handler.write_byte.unwrap();
        let write_end = shim.handler.write_end.unwrap();
        let context = shim.context();
        assert_eq!(unsafe { write_byte(context, c_int::from(b'<')) }, 0);
        assert_eq!(write(&mut shim, b"abcd", 2), 2);
        assert_eq!(write(&mut shim, b"", 1), 0);
        assert_eq!(unsafe { write_end(context) }, 0);
        assert!(shim.error.is_none());
        assert_eq!(shim.target.as_deref(), Some(&b"<abcd"[..]));
    }

    #[test]
    fn write_errors_are_kept() {
        let mut shim = Shim::new(Failing, writer_handler::<Failing>());
        let write_byte = shim.handler.write_byte.unwrap();
        let write_end = shim.handler.write_end.unwrap();
        let context = shim.context();
        assert_eq!(write(&mut shim, b"abc", 1), -1);
        assert_eq!(unsafe { write_byte(context, 0) }, 1);
        assert_eq!(unsafe { write_end(context) }, 1);
        // Only the first error is reported.
        assert_eq!(shim.error.take().unwrap().to_string(), "disk full");
    }

    #[test]
    fn writer_panics_are_caught() {
        let mut shim = Shim::new(Panicking, writer_handler::<Panicking>());
        assert_eq!(write(&mut shim, b"abc", 1), -1);
        assert!(shim.panic.is_some());
        assert!(shim.error.is_none());
    }

    #[test]
    fn closed_targets_fail() {
        let mut shim = Shim::new(Vec::new(), writer_handler::<Vec<u8>>());
        shim.target = None;
        assert_eq!(write(&mut shim, b"abc", 1), -1);
        assert_eq!(shim.error.take().unwrap().kind(), io::ErrorKind::Other);
    }

    #[test]
    fn reads_return_what_is_available() {
        let source = Trickle(io::Cursor::new(&b"abcdefg"[..]));
        let mut shim = Shim::new(source, reader_handler::<Trickle>());
        let mut buffer = [0; 16];
        assert_eq!(read(&mut shim, &mut buffer), 3);
        assert_eq!(&buffer[..3], b"abc");
        assert!(!at_eof(&mut shim));
        assert_eq!(read(&mut shim, &mut buffer), 3);
        assert_eq!(read(&mut shim, &mut buffer), 1);
        assert_eq!(buffer[0], b'g');
        assert!(!at_eof(&mut shim));
        assert_eq!(read(&mut shim, &mut buffer), 0);
        assert!(at_eof(&mut shim));
    }

    #[test]
    fn read_errors_are_kept() {
        let mut shim = Shim::new(Broken, reader_handler::<Broken>());
        let mut buffer = [0; 16];
        assert_eq!(read(&mut shim, &mut buffer), -1);
        assert!(!at_eof(&mut shim));
        assert_eq!(
            shim.error.take().unwrap().kind(),
            io::ErrorKind::ConnectionReset
        );
    }
}
