//! Download progress tracking and rendering.
//!
//! [`ProgressState`] is owned by a single relay run. It decides when a new
//! progress edit is due (throttle interval plus strictly increasing percent)
//! and remembers the last rendered text so identical edits are never sent.

use crate::config::PROGRESS_BAR_WIDTH;
use crate::utils::format_size;
use std::time::Duration;
use tokio::time::Instant;

const FILLED_GLYPH: &str = "█";
const EMPTY_GLYPH: &str = "░";

/// Renders a fixed-width progress bar.
///
/// `percent` must be in `0..=100`; callers clamp before rendering.
///
/// # Examples
///
/// ```
/// use file_relay_bot::relay::progress::render_bar;
/// assert_eq!(render_bar(50), "██████████░░░░░░░░░░");
/// ```
#[must_use]
pub fn render_bar(percent: u8) -> String {
    let filled = usize::from(percent) * PROGRESS_BAR_WIDTH / 100;
    format!(
        "{}{}",
        FILLED_GLYPH.repeat(filled),
        EMPTY_GLYPH.repeat(PROGRESS_BAR_WIDTH - filled)
    )
}

/// Percentage of `declared` covered by `received`, floored and clamped to 100.
///
/// A zero `declared` size counts as complete.
#[must_use]
pub fn percent_of(received: u64, declared: u64) -> u8 {
    if declared == 0 {
        return 100;
    }
    let percent = received.min(declared).saturating_mul(100) / declared;
    u8::try_from(percent).unwrap_or(100)
}

/// Message text shown while the body is streaming.
#[must_use]
pub fn render_downloading(file_name: &str, percent: u8, total: u64) -> String {
    format!(
        "⏳ <b>Downloading</b> <code>{}</code>\n{} {percent}%\n📦 {}",
        html_escape::encode_text(file_name),
        render_bar(percent),
        format_size(total)
    )
}

/// Message text shown once the body is complete and the upload starts.
#[must_use]
pub fn render_download_complete(file_name: &str, total: u64) -> String {
    format!(
        "✅ <b>Download complete</b> <code>{}</code>\n{} 100%\n📦 {}\n\n⬆️ Uploading to Telegram...",
        html_escape::encode_text(file_name),
        render_bar(100),
        format_size(total)
    )
}

/// Mutable progress bookkeeping for one relay run
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Bytes accumulated so far
    pub bytes_received: u64,
    /// Percent carried by the last emitted edit
    pub last_reported_percent: u8,
    /// When the last edit was emitted
    pub last_reported_at: Instant,
    /// Text of the last rendered progress message
    pub last_rendered_text: String,
}

impl ProgressState {
    /// Creates a state anchored at `started_at` with the initial 0% text.
    #[must_use]
    pub fn new(started_at: Instant, initial_text: String) -> Self {
        Self {
            bytes_received: 0,
            last_reported_percent: 0,
            last_reported_at: started_at,
            last_rendered_text: initial_text,
        }
    }

    /// Adds a received chunk to the byte count.
    pub fn record_chunk(&mut self, len: usize) {
        self.bytes_received = self.bytes_received.saturating_add(len as u64);
    }

    /// Whether an edit for `percent` may be emitted at `now`.
    ///
    /// Both conditions must hold: `interval` elapsed since the last emission
    /// and `percent` strictly above the last reported percent.
    #[must_use]
    pub fn is_due(&self, percent: u8, now: Instant, interval: Duration) -> bool {
        percent > self.last_reported_percent
            && now.saturating_duration_since(self.last_reported_at) >= interval
    }

    /// Records an emission at `now` for `percent`.
    pub fn mark_reported(&mut self, percent: u8, now: Instant) {
        self.last_reported_percent = self.last_reported_percent.max(percent);
        self.last_reported_at = now;
    }

    /// Stores `text` as the latest rendering.
    ///
    /// Returns `false` when it equals the previous rendering, in which case no
    /// edit should be sent.
    pub fn replace_text(&mut self, text: &str) -> bool {
        if self.last_rendered_text == text {
            return false;
        }
        self.last_rendered_text = text.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(3000);

    #[test]
    fn bar_has_fixed_width_for_all_percentages() {
        for p in 0..=100u8 {
            let bar = render_bar(p);
            assert_eq!(bar.chars().count(), PROGRESS_BAR_WIDTH, "percent {p}");
            let filled = bar.chars().filter(|c| *c == '█').count();
            assert_eq!(filled, usize::from(p) * 20 / 100, "percent {p}");
        }
    }

    #[test]
    fn bar_edges() {
        assert_eq!(render_bar(0), "░".repeat(20));
        assert_eq!(render_bar(4), "░".repeat(20));
        assert_eq!(render_bar(5), format!("█{}", "░".repeat(19)));
        assert_eq!(render_bar(100), "█".repeat(20));
    }

    #[test]
    fn percent_floors_and_clamps() {
        assert_eq!(percent_of(0, 1000), 0);
        assert_eq!(percent_of(999, 1000), 99);
        assert_eq!(percent_of(1000, 1000), 100);
        // Server sent more than it declared
        assert_eq!(percent_of(5000, 1000), 100);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn due_requires_interval_and_progress() {
        let start = Instant::now();
        let mut state = ProgressState::new(start, String::new());

        assert!(!state.is_due(10, start + Duration::from_millis(2999), INTERVAL));
        assert!(!state.is_due(0, start + Duration::from_millis(5000), INTERVAL));
        assert!(state.is_due(10, start + INTERVAL, INTERVAL));

        state.mark_reported(10, start + INTERVAL);
        assert!(!state.is_due(10, start + Duration::from_millis(9000), INTERVAL));
        assert!(!state.is_due(50, start + Duration::from_millis(4000), INTERVAL));
        assert!(state.is_due(11, start + Duration::from_millis(6000), INTERVAL));
    }

    #[test]
    fn reported_percent_never_decreases() {
        let start = Instant::now();
        let mut state = ProgressState::new(start, String::new());
        state.mark_reported(40, start);
        state.mark_reported(30, start);
        assert_eq!(state.last_reported_percent, 40);
    }

    #[test]
    fn identical_text_is_not_replaced() {
        let mut state = ProgressState::new(Instant::now(), "a".to_string());
        assert!(!state.replace_text("a"));
        assert!(state.replace_text("b"));
        assert!(!state.replace_text("b"));
        assert_eq!(state.last_rendered_text, "b");
    }

    #[test]
    fn throttle_bounds_edits_over_simulated_download() {
        // One chunk every 10 ms for 5 s with strictly increasing percent
        let start = Instant::now();
        let mut state = ProgressState::new(start, String::new());
        let declared = 500u64;
        let mut edits = 0;

        for step in 1..=500u64 {
            let now = start + Duration::from_millis(step * 10);
            state.record_chunk(1);
            let percent = percent_of(state.bytes_received, declared);
            if state.is_due(percent, now, INTERVAL) {
                state.mark_reported(percent, now);
                edits += 1;
            }
        }

        assert!(edits <= 5000_usize.div_ceil(3000) + 1, "edits: {edits}");
        assert_eq!(edits, 1);
    }

    #[test]
    fn downloading_text_escapes_name() {
        let text = render_downloading("a<b>.txt", 50, 2048);
        assert!(text.contains("a&lt;b&gt;.txt"));
        assert!(text.contains("50%"));
        assert!(text.contains("2 KB"));
    }
}
