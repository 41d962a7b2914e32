//! Badge updater: today's request count as a short display string.
//!
//! The badge is the daemon's equivalent of a toolbar overlay: a tiny
//! `badge.json` in the state directory that status-bar widgets can poll.
//! Zero renders as an empty string, not "0".

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::settings::Settings;
use crate::usage::UsageQuery;

/// Fixed badge background color.
pub const BADGE_COLOR: &str = "#4285F4";

/// Renders a request count as badge text: empty for zero, decimal otherwise.
#[must_use]
pub fn badge_text(count: u64) -> String {
    if count > 0 {
        count.to_string()
    } else {
        String::new()
    }
}

/// Host badge surface.
pub trait BadgeDisplay: Send + Sync {
    /// Sets the badge text. Empty string hides the badge.
    fn set_text(&self, text: &str) -> Result<()>;

    /// Sets the badge background color.
    fn set_background_color(&self, color: &str) -> Result<()>;
}

/// Persisted badge state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BadgeState {
    text: String,
    color: String,
}

impl Default for BadgeState {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: BADGE_COLOR.to_string(),
        }
    }
}

/// File-backed [`BadgeDisplay`] writing `badge.json` into the state dir.
#[derive(Debug)]
pub struct FileBadge {
    path: PathBuf,
    state: Mutex<BadgeState>,
}

impl FileBadge {
    /// Creates a badge surface under the given state directory.
    #[must_use]
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join("badge.json"),
            state: Mutex::new(BadgeState::default()),
        }
    }

    fn persist(&self, state: &BadgeState) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BadgeState)) -> Result<()> {
        let mut state = self.state.lock().expect("badge state lock poisoned");
        apply(&mut state);
        self.persist(&state)
    }
}

impl BadgeDisplay for FileBadge {
    fn set_text(&self, text: &str) -> Result<()> {
        debug!(text, "badge text updated");
        self.update(|state| state.text = text.to_string())
    }

    fn set_background_color(&self, color: &str) -> Result<()> {
        self.update(|state| state.color = color.to_string())
    }
}

/// Refreshes the badge from today's usage.
///
/// With quick view disabled the badge is blanked without any remote call;
/// otherwise today's count (fail-open to zero) becomes the badge text.
pub async fn refresh_badge(
    settings: &Settings,
    usage: &UsageQuery<'_>,
    badge: &dyn BadgeDisplay,
) -> Result<()> {
    if !settings.quick_view_requests {
        badge.set_text("")?;
        return Ok(());
    }

    let count = usage.today().await.or_zero();
    badge.set_text(&badge_text(count))?;
    badge.set_background_color(BADGE_COLOR)?;
    Ok(())
}
