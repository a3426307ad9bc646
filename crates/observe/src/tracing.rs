use {
    crate::{config::Config, panic_hook},
    std::{io::IsTerminal, sync::Once},
    time::macros::format_description,
    tracing::Level,
    tracing_subscriber::{
        EnvFilter,
        Layer,
        fmt::{time::UtcTime, writer::MakeWriterExt as _},
        prelude::*,
        util::SubscriberInitExt,
    },
};

/// Initializes tracing setup that is shared between the binaries.
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
///
/// Events at or above the configured stderr threshold (`ERROR` if unset) are
/// written to stderr, everything else goes to stdout.
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
    panic_hook::install();
}

/// Like [`initialize`], but can be called multiple times in a row. Later calls
/// are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(config: &Config) {
    // The tracing subscriber below is global object so initializing it again in the
    // same process by a different thread would fail.
    static ONCE: Once = Once::new();
    ONCE.call_once(|| initialize(config));
}

fn set_tracing_subscriber(config: &Config) {
    let stderr_threshold = config.stderr_threshold.unwrap_or(Level::ERROR);

    // The `fmt` layer changes its type depending on the output format so the
    // shared parts are spelled out once per branch.
    macro_rules! fmt_layer {
        () => {{
            tracing_subscriber::fmt::layer()
                .with_writer(
                    std::io::stderr
                        .with_max_level(stderr_threshold)
                        .or_else(std::io::stdout),
                )
                .with_timer(UtcTime::new(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
                )))
        }};
    }

    let env_filter = EnvFilter::new(&config.env_filter);
    if config.use_json_format {
        tracing_subscriber::registry()
            .with(fmt_layer!().json().with_filter(env_filter))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt_layer!()
                    .with_ansi(std::io::stdout().is_terminal())
                    .with_filter(env_filter),
            )
            .init();
    }
    tracing::debug!(
        filter = %config.env_filter,
        json = config.use_json_format,
        "initialized tracing"
    );
}
