use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::MakeWriter;

/// Diagnostics go to stderr so stdout stays clean for command output.
#[derive(Clone, Copy)]
pub(crate) struct StderrMakeWriter;

impl<'a> MakeWriter<'a> for StderrMakeWriter {
    type Writer = std::io::Stderr;

    fn make_writer(&'a self) -> Self::Writer {
        std::io::stderr()
    }
}

pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

pub fn init(verbosity: u8) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level_for(verbosity))
        .with_target(false)
        .with_ansi(console::colors_enabled_stderr())
        .with_writer(StderrMakeWriter)
        .finish();
    // A second init (tests, embedding) keeps the first subscriber.
    tracing::subscriber::set_global_default(subscriber).ok();
}
