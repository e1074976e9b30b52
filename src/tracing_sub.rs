use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;

pub struct DelegatingWriter {
    inner: DelegatingInner,
}

enum DelegatingInner {
    File(Arc<File>),
    Stderr(io::Stderr),
}

impl Write for DelegatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            DelegatingInner::File(f) => (&**f).write(buf),
            DelegatingInner::Stderr(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            DelegatingInner::File(f) => (&**f).flush(),
            DelegatingInner::Stderr(s) => s.flush(),
        }
    }
}

/// Hands out writers to the log file when one is open, stderr otherwise.
#[derive(Clone, Debug, Default)]
pub struct SubscriberMakeWriter {
    file: Option<Arc<File>>,
}

impl SubscriberMakeWriter {
    pub fn stderr() -> Self {
        Self::default()
    }

    /// Append to `path`, creating it if needed.
    pub fn append_to(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Some(Arc::new(file)),
        })
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SubscriberMakeWriter {
    type Writer = DelegatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        let inner = match &self.file {
            Some(file) => DelegatingInner::File(Arc::clone(file)),
            None => DelegatingInner::Stderr(io::stderr()),
        };
        DelegatingWriter { inner }
    }
}

pub fn max_level(debug: bool) -> Level {
    if debug { Level::DEBUG } else { Level::INFO }
}

/// Install the global subscriber. DEBUG when `debug` is set, INFO otherwise.
/// Logs go to `log_file` when given (falling back to stderr if it cannot be
/// opened). Safe to call multiple times; later calls are no-ops.
pub fn init(debug: bool, log_file: Option<&Path>) {
    let writer = match log_file.map(SubscriberMakeWriter::append_to) {
        Some(Ok(writer)) => writer,
        Some(Err(err)) => {
            eprintln!("could not open log file, logging to stderr: {err}");
            SubscriberMakeWriter::stderr()
        }
        None => SubscriberMakeWriter::stderr(),
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(max_level(debug))
        .with_writer(writer)
        .with_target(false)
        .with_thread_names(false)
        .try_init();
}
