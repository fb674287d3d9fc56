use tokio::select;
use tokio_util::sync::CancellationToken;

/// Turns ctrl-c into a cancellation, so every module gets to flush before the
/// process disappears. Also resolves when something else (the `quit` command)
/// cancelled the token first.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
