// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging and colorization for xunit-report.

use clap::ValueEnum;
use owo_colors::{OwoColorize, Style, style};
use std::fmt;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable used to configure log levels, e.g. `quick_xunit=debug`.
pub static LOG_ENV: &str = "QUICK_XUNIT_LOG";

/// Log target for error chains: printed without a level heading.
pub(crate) const NO_HEADING_TARGET: &str = "xunit_report::no_heading";

/// High level specification of output options.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    /// Whether debug logging was requested.
    pub verbose: bool,

    /// How colorization is determined.
    pub color: Color,
}

impl OutputContext {
    /// Initializes logging. Only the first call has an effect.
    pub fn init(self) -> Self {
        self.color.init(self.verbose);
        self
    }
}

/// Specifies whether to colorize output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub enum Color {
    /// Colorize if stderr supports it and `NO_COLOR` is not set.
    #[default]
    Auto,

    /// Always colorize.
    Always,

    /// Never colorize.
    Never,
}

impl Color {
    fn init(self, verbose: bool) {
        let mut log_styles = LogStyles::default();
        if self.should_colorize(supports_color::Stream::Stderr) {
            log_styles.colorize();
        }

        INIT_LOGGER.call_once(|| {
            let default_level = if verbose {
                LevelFilter::DEBUG
            } else {
                LevelFilter::INFO
            };
            let targets = match std::env::var(LOG_ENV) {
                Ok(level_str) if !level_str.is_empty() => {
                    level_str.parse().unwrap_or_else(|error| {
                        eprintln!("warning: ignoring invalid {LOG_ENV} ({error})");
                        Targets::new().with_default(default_level)
                    })
                }
                // If the level string is empty or unset, use the standard level filter instead.
                _ => Targets::new().with_default(default_level),
            };

            let layer = tracing_subscriber::fmt::layer()
                .event_format(SimpleFormatter { styles: log_styles })
                .with_writer(std::io::stderr)
                .with_filter(targets);

            tracing_subscriber::registry().with(layer).init();
        });
    }

    /// Determines whether output should be colorized based on whether the given stream supports
    /// this.
    pub fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

struct SimpleFormatter {
    styles: LogStyles,
}

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        if metadata.target() != NO_HEADING_TARGET {
            match *metadata.level() {
                Level::ERROR => write!(writer, "{}: ", "error".style(self.styles.error))?,
                Level::WARN => write!(writer, "{}: ", "warning".style(self.styles.warning))?,
                Level::INFO => write!(writer, "{}: ", "info".style(self.styles.info))?,
                Level::DEBUG => write!(writer, "{}: ", "debug".style(self.styles.debug))?,
                Level::TRACE => write!(writer, "{}: ", "trace".style(self.styles.trace))?,
            }
        }

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            // Show other fields for debug or trace output.
            show_other: *metadata.level() >= Level::DEBUG,
            error: None,
        };

        event.record(&mut visitor);

        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

static MESSAGE_FIELD: &str = "message";

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    show_other: bool,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let result = if field.name() == MESSAGE_FIELD {
            write!(self.writer, "{value:?}")
        } else if self.show_other {
            write!(self.writer, "; {} = {:?}", field.name(), value)
        } else {
            Ok(())
        };
        if let Err(error) = result {
            self.error = Some(error);
        }
    }
}

static INIT_LOGGER: std::sync::Once = std::sync::Once::new();

#[derive(Debug, Default)]
struct LogStyles {
    error: Style,
    warning: Style,
    info: Style,
    debug: Style,
    trace: Style,
}

impl LogStyles {
    fn colorize(&mut self) {
        self.error = style().red().bold();
        self.warning = style().yellow().bold();
        self.info = style().bold();
        self.debug = style().bold();
        self.trace = style().dimmed();
    }
}
