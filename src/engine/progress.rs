//! Progress bar utilities for long single-threaded passes (sweep, sync)

use kdam::{Animation, Bar, BarExt};

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> Bar {
    kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " files"
    )
}

/// A bar only when `enabled`; callers pass the result to [`update_progress_bar`].
pub fn optional_bar(enabled: bool, total: usize, desc: &'static str) -> Option<Bar> {
    enabled.then(|| create_progress_bar(ProgressBarConfig::new(total, desc, Animation::Classic)))
}

/// Advance by `n`. No-op without a bar; display errors are ignored.
pub fn update_progress_bar(pb: &mut Option<Bar>, n: usize) {
    if let Some(pb) = pb.as_mut() {
        let _ = pb.update(n);
    }
}

/// Move the cursor below a finished bar so following output starts on a fresh line.
pub fn finish_progress_bar(pb: Option<Bar>) {
    if let Some(mut pb) = pb {
        let _ = pb.refresh();
        eprintln!();
    }
}
