pub mod alerts;
pub mod capture;
pub mod migrate;
pub mod serve;
pub mod target;

/// Builds a single-threaded current-thread Tokio runtime for the commands
/// that need one. Kept separate from `#[tokio::main]` on `main` itself so a
/// parse error in one subcommand's args never pays for spinning up a runtime
/// another subcommand doesn't need.
pub(crate) fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime initialization never fails on a supported platform")
        .block_on(future)
}
