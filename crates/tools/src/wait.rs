//! Wait tool: sleep so background jobs can make progress.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct WaitArgs {
    pub seconds: f64,
}

/// Clamp a requested wait to `[0, max_secs]`. NaN counts as zero.
pub fn clamp_wait(seconds: f64, max_secs: u64) -> Duration {
    if !seconds.is_finite() || seconds <= 0.0 {
        return if seconds == f64::INFINITY {
            Duration::from_secs(max_secs)
        } else {
            Duration::ZERO
        };
    }
    Duration::from_secs_f64(seconds.min(max_secs as f64))
}

/// Sleep for the clamped duration and describe it.
pub async fn wait(args: WaitArgs, max_secs: u64) -> String {
    let duration = clamp_wait(args.seconds, max_secs);
    tracing::debug!(secs = duration.as_secs_f64(), "Waiting");
    tokio::time::sleep(duration).await;
    format!("Waited {:.1}s.", duration.as_secs_f64())
}
