use anyhow::Result;

/// The host runs every handler and timer on one thread, which is what keeps session
/// transitions totally ordered.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
