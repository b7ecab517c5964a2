//! Heuristic detection of action names that plausibly perform credentialed or
//! destructive operations.

use serde::Deserialize;
use serde::Serialize;

/// Flags actions whose names suggest form submission, credential entry, or
/// file upload.
///
/// Matching is loose, symmetric containment: the action name containing a
/// keyword flags it, and a keyword containing the action name flags it too.
/// This is a deliberate heuristic — "submit_order" and "sub" both trip the
/// "submit" keyword — chosen over exact matching so renamed or abbreviated
/// actions stay covered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveActionClassifier {
    pub keywords: Vec<String>,
}

impl Default for SensitiveActionClassifier {
    fn default() -> Self {
        Self {
            keywords: vec![
                "fill_form".to_string(),
                "submit".to_string(),
                "upload_file".to_string(),
            ],
        }
    }
}

impl SensitiveActionClassifier {
    pub fn is_sensitive(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        if name.is_empty() {
            return false;
        }
        self.keywords
            .iter()
            .any(|keyword| name.contains(keyword.as_str()) || keyword.contains(name.as_str()))
    }
}
