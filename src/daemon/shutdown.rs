use tokio::select;
use tokio_util::sync::CancellationToken;

/// Detects signals sent to the process. Also resolves when something else
/// cancels the token, the message pump does so when the browser closes the
/// pipe.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}
