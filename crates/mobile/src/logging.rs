use std::{panic::PanicHookInfo, sync::Once};

use tracing_subscriber::{filter::FilterFn, layer::SubscriberExt, util::SubscriberInitExt};

pub(crate) fn setup_logging() {
    static LOGGING_SETUP: Once = Once::new();

    LOGGING_SETUP.call_once(|| {
        if let Err(error) = install() {
            eprintln!("nimetro: logging unavailable: {error}");
        }
        std::panic::set_hook(Box::new(panic_hook));
    })
}

fn is_crate_event(metadata: &tracing::Metadata<'_>) -> bool {
    metadata.module_path().unwrap_or_default().starts_with("nimetro")
}

#[cfg(target_os = "android")]
fn install() -> Result<(), String> {
    use tracing_logcat::{LogcatMakeWriter, LogcatTag};
    use tracing_subscriber::fmt::format::Format;

    let tag = LogcatTag::Fixed("NiMetro-Rust".to_owned());
    let writer = LogcatMakeWriter::new(tag).map_err(|error| error.to_string())?;
    let layer = tracing_subscriber::fmt::layer()
        .event_format(Format::default().with_level(false).without_time())
        .with_writer(writer)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(layer)
        .with(FilterFn::new(is_crate_event))
        .try_init()
        .map_err(|error| error.to_string())
}

#[cfg(not(target_os = "android"))]
fn install() -> Result<(), String> {
    let layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(layer)
        .with(FilterFn::new(is_crate_event))
        .try_init()
        .map_err(|error| error.to_string())
}

fn panic_hook(info: &PanicHookInfo) {
    tracing::error!("{info}")
}
