pub mod logging;
pub mod session;

uniffi::setup_scaffolding!();

/// Install logging and the panic hook.
/// Call this once at startup from Kotlin/Swift; starting a session also does it.
#[uniffi::export]
pub fn init_logging() {
    logging::setup_logging();
}
