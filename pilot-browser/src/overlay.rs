//! Detection of blocking overlays (dialogs, cookie banners, popups) from
//! structural page snapshots, and the retry hints derived from them.

use serde::Deserialize;
use serde::Serialize;

use crate::driver::Snapshot;

/// Fallback hint when no specific close control is visible.
pub const GENERIC_DISMISS_HINT: &str =
    "Find and click a close control (an X button or a dismiss link) to clear the overlay.";

/// Result of inspecting one snapshot for a blocking overlay.
///
/// Two results describe the same overlay iff their signatures are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayDetection {
    pub has_overlay: bool,
    /// Joined list of the indicator patterns that matched.
    pub signature: String,
    /// What the model should try next to clear the overlay.
    pub suggested_action: String,
}

impl OverlayDetection {
    fn none() -> Self {
        Self {
            has_overlay: false,
            signature: String::new(),
            suggested_action: String::new(),
        }
    }
}

/// Inspects structural snapshots for blocking overlays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayDiagnostics {
    /// Markers whose presence indicates an overlay. Lowercase; matched
    /// case-insensitively against the structural text.
    pub indicators: Vec<String>,
    /// Close-control vocabulary searched for a specific suggestion.
    pub close_controls: Vec<String>,
}

impl Default for OverlayDiagnostics {
    fn default() -> Self {
        Self {
            indicators: [
                "role=\"dialog\"",
                "role=\"alertdialog\"",
                "modal",
                "cookie",
                "consent",
                "newsletter",
                "subscribe",
                "popup",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            close_controls: ["close", "dismiss", "no thanks", "got it", "reject", "accept"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl OverlayDiagnostics {
    /// Inspect one structural snapshot.
    pub fn detect(&self, snapshot: &Snapshot) -> OverlayDetection {
        let haystack = snapshot.structure.to_ascii_lowercase();
        let matched: Vec<&str> = self
            .indicators
            .iter()
            .filter(|p| haystack.contains(p.as_str()))
            .map(String::as_str)
            .collect();
        if matched.is_empty() {
            return OverlayDetection::none();
        }
        let signature = matched.join("+");
        let suggested_action = self
            .close_controls
            .iter()
            .find(|c| haystack.contains(c.as_str()))
            .map(|c| format!("Click the '{c}' control to dismiss the overlay."))
            .unwrap_or_else(|| GENERIC_DISMISS_HINT.to_string());
        OverlayDetection {
            has_overlay: true,
            signature,
            suggested_action,
        }
    }

    /// Whether the action between `before` and `after` was likely swallowed
    /// by an overlay: both snapshots show one, and it is the same one.
    pub fn was_blocked_by(&self, before: &Snapshot, after: &Snapshot) -> bool {
        let before = self.detect(before);
        let after = self.detect(after);
        before.has_overlay && after.has_overlay && before.signature == after.signature
    }
}
