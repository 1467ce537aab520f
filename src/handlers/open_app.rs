use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{failure_reason, TaskHandler};
use crate::capability::AppLauncher;
use crate::clock::Clock;
use crate::command::ModelCommand;
use crate::error::CapabilityError;
use crate::extract::Extractor;
use crate::intent::{IntentCategory, Utterance};
use crate::normalize::fold_name;
use crate::session::{CompletionParams, ModelSession};

const SYSTEM_PROMPT: &str = r#"Extract the application name after the word "open" from the given sentence. Respond in pure JSON format like {"App":""}. Use lowercase app names without space, e.g. "youtube", "calendar", "googlephotos"."#;

/// Built-in label table. Candidates are probed in order.
const KNOWN_APPS: &[(&str, &[&str])] = &[
    ("youtube", &["com.google.android.youtube"]),
    ("photos", &["com.google.android.apps.photos"]),
    ("googlephotos", &["com.google.android.apps.photos"]),
    ("calendar", &["com.google.android.calendar", "com.samsung.android.calendar"]),
    ("gmail", &["com.google.android.gm"]),
    ("whatsapp", &["com.whatsapp", "com.whatsapp.w4b"]),
    ("chrome", &["com.android.chrome"]),
    ("facebook", &["com.facebook.katana", "com.facebook.lite"]),
    ("instagram", &["com.instagram.android"]),
    (
        "camera",
        &[
            "com.android.camera",
            "com.google.android.GoogleCamera",
            "com.sec.android.app.camera",
            "com.oneplus.camera",
            "com.motorola.camera3",
        ],
    ),
    (
        "messages",
        &[
            "com.google.android.apps.messaging",
            "com.samsung.android.messaging",
            "com.android.mms",
        ],
    ),
    ("maps", &["com.google.android.apps.maps"]),
    ("settings", &["com.android.settings"]),
    ("clock", &["com.google.android.deskclock", "com.sec.android.app.clockpackage"]),
    ("contacts", &["com.google.android.contacts", "com.samsung.android.app.contacts"]),
    ("phone", &["com.google.android.dialer", "com.samsung.android.dialer"]),
];

/// Maps spoken application labels to launcher identifiers.
#[derive(Debug, Clone)]
pub struct AppCatalog {
    entries: HashMap<String, Vec<String>>,
}

impl Default for AppCatalog {
    fn default() -> Self {
        let entries = KNOWN_APPS
            .iter()
            .map(|(label, ids)| {
                (label.to_string(), ids.iter().map(|id| id.to_string()).collect())
            })
            .collect();
        Self { entries }
    }
}

impl AppCatalog {
    /// Add or replace a label. Later calls win.
    pub fn with_alias(mut self, label: &str, identifiers: Vec<String>) -> Self {
        self.entries.insert(fold_name(label), identifiers);
        self
    }

    /// Candidate identifiers for `label`, trying it with spaces removed too.
    ///
    /// ```
    /// use errand::handlers::AppCatalog;
    /// let catalog = AppCatalog::default();
    /// assert_eq!(catalog.candidates("Google Photos"), catalog.candidates("photos"));
    /// assert!(catalog.candidates("nonexistent").is_none());
    /// ```
    pub fn candidates(&self, label: &str) -> Option<&[String]> {
        let label = fold_name(label);
        self.entries
            .get(&label)
            .or_else(|| self.entries.get(&label.replace(' ', "")))
            .map(Vec::as_slice)
    }
}

/// Launches an application named in the request.
pub struct OpenAppHandler {
    launcher: Arc<dyn AppLauncher>,
    catalog: AppCatalog,
    extractor: Extractor,
    clock: Arc<dyn Clock>,
}

impl OpenAppHandler {
    pub fn new(
        launcher: Arc<dyn AppLauncher>,
        catalog: AppCatalog,
        extractor: Extractor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            launcher,
            catalog,
            extractor,
            clock,
        }
    }

    async fn open(&self, label: &str) -> String {
        let Some(candidates) = self.catalog.candidates(label) else {
            return format!(
                "❔ I couldn't find a known app for \"{label}\". Please try a different app."
            );
        };
        for id in candidates {
            if !self.launcher.is_installed(id).await {
                debug!(%id, "candidate not installed");
                continue;
            }
            info!(%label, %id, "launching app");
            return match self.launcher.launch(id).await {
                Ok(()) => format!("📱 Opening {label}..."),
                Err(e) => {
                    warn!(error = %e, "launch failed");
                    format!("⚠️ Failed to open app. {e}")
                }
            };
        }
        format!("⚠️ {}", CapabilityError::NotInstalled(label.to_string()))
    }
}

#[async_trait]
impl TaskHandler for OpenAppHandler {
    fn category(&self) -> IntentCategory {
        IntentCategory::OpenApp
    }

    async fn handle(&self, utterance: &Utterance, session: &ModelSession) -> anyhow::Result<String> {
        debug!(input = %utterance.text(), "open app request");
        let raw = match session
            .complete_with(SYSTEM_PROMPT, utterance.text(), &CompletionParams::TERSE)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "open app completion failed");
                return Ok(format!("⚠️ Failed to open app. {e}"));
            }
        };

        let extraction = self
            .extractor
            .extract(IntentCategory::OpenApp, &raw, self.clock.now());
        match &extraction.command {
            ModelCommand::OpenApp(cmd) if !extraction.is_fallback() => Ok(self.open(&cmd.label).await),
            _ => Ok(format!(
                "⚠️ Failed to open app. {}",
                failure_reason(&extraction)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_label_has_a_candidate() {
        let catalog = AppCatalog::default();
        for (label, _) in KNOWN_APPS {
            assert!(!catalog.candidates(label).unwrap().is_empty(), "{label}");
        }
    }

    #[test]
    fn camera_lists_oem_fallbacks_after_primary() {
        let catalog = AppCatalog::default();
        let ids = catalog.candidates("camera").unwrap();
        assert_eq!(ids[0], "com.android.camera");
        assert!(ids.len() > 1);
    }

    #[test]
    fn aliases_override_builtins() {
        let catalog = AppCatalog::default()
            .with_alias("Notes", vec!["org.example.notes".into()])
            .with_alias("camera", vec!["org.example.cam".into()]);
        assert_eq!(catalog.candidates("notes").unwrap(), ["org.example.notes"]);
        assert_eq!(catalog.candidates("CAMERA").unwrap(), ["org.example.cam"]);
    }
}
