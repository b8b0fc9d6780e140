use tokio::select;
use tokio_util::sync::CancellationToken;

/// Cancels the token once Ctrl-C is received, or stops listening once the token is cancelled
/// elsewhere.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {}
    };
}
