//! The turn-bounded control loop.
//!
//! One loop instance progresses one task: ask the model for the next step,
//! guard it, dispatch it to the driver, capture the new page state, diagnose
//! overlays, and feed everything back until the model answers with text, the
//! task is cancelled, or the turn cap is reached. Guards never call back into
//! the loop.

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use pilot_browser::{
    ActionOutcome, BrowserAction, DriverPool, DriverSession, OverlayDiagnostics, Snapshot,
};
use pilot_guard::{RateLimiter, SensitiveActionClassifier, UrlDecision, UrlGuard};

use crate::model::{ConversationItem, ModelClient, ModelStep};

/// Hard cap on loop iterations per task.
pub const MAX_TURNS: u32 = 20;

/// Terminal states of one agent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The model produced a final text answer.
    Completed,
    /// The abort signal fired.
    Cancelled,
    /// The turn cap was reached before a final answer.
    Truncated,
    /// An unrecoverable error (the model client itself failing).
    Failed,
}

/// One loop iteration: one model decision plus (optionally) one dispatched
/// action and its resulting state capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTurn {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_result: Option<ActionOutcome>,
    /// URL of the snapshot captured after the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_url: Option<String>,
}

/// Final result of one task run. Progress is never silently discarded: the
/// turns taken so far ride along with every status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: TaskStatus,
    pub text: String,
    pub turns: Vec<AgentTurn>,
    /// Explicit truncation marker for partial results.
    pub truncated: bool,
}

impl TaskResult {
    fn completed(text: String, turns: Vec<AgentTurn>) -> Self {
        Self {
            status: TaskStatus::Completed,
            text,
            turns,
            truncated: false,
        }
    }

    fn cancelled(turns: Vec<AgentTurn>) -> Self {
        Self {
            status: TaskStatus::Cancelled,
            text: "task cancelled".to_string(),
            turns,
            truncated: false,
        }
    }

    fn truncated(turns: Vec<AgentTurn>, cap: u32) -> Self {
        Self {
            status: TaskStatus::Truncated,
            text: format!("turn cap of {cap} reached before the task completed"),
            turns,
            truncated: true,
        }
    }

    fn failed(error: String, turns: Vec<AgentTurn>) -> Self {
        Self {
            status: TaskStatus::Failed,
            text: error,
            turns,
            truncated: false,
        }
    }
}

/// Orchestrates one task: model exchange, guards, dispatch, diagnosis.
pub struct AgentLoop<M> {
    model: M,
    pool: Arc<DriverPool>,
    rate_limiter: Arc<RateLimiter>,
    url_guard: UrlGuard,
    classifier: SensitiveActionClassifier,
    overlay: OverlayDiagnostics,
    max_turns: u32,
}

impl<M: ModelClient> AgentLoop<M> {
    pub fn new(model: M, pool: Arc<DriverPool>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            model,
            pool,
            rate_limiter,
            url_guard: UrlGuard::default(),
            classifier: SensitiveActionClassifier::default(),
            overlay: OverlayDiagnostics::default(),
            max_turns: MAX_TURNS,
        }
    }

    pub fn with_url_guard(mut self, url_guard: UrlGuard) -> Self {
        self.url_guard = url_guard;
        self
    }

    pub fn with_classifier(mut self, classifier: SensitiveActionClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_overlay(mut self, overlay: OverlayDiagnostics) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Run one task to a terminal state.
    ///
    /// The cancellation signal is checked before each model request and
    /// before each dispatch; an in-flight driver call is not interrupted.
    pub async fn run(&self, task: &str, cancel: &CancellationToken) -> TaskResult {
        let session = match self.pool.acquire().await {
            Ok(session) => session,
            Err(err) => return TaskResult::failed(err.to_string(), Vec::new()),
        };

        let mut conversation = vec![ConversationItem::Task {
            text: task.to_string(),
        }];
        let mut last_snapshot = session.driver().snapshot().await.ok();
        if let Some(snapshot) = &last_snapshot {
            conversation.push(ConversationItem::Page {
                snapshot: snapshot.clone(),
            });
        }

        let mut turns: Vec<AgentTurn> = Vec::new();
        while (turns.len() as u32) < self.max_turns {
            if cancel.is_cancelled() {
                return TaskResult::cancelled(turns);
            }

            let step = match self.model.next_step(&conversation).await {
                Ok(step) => step,
                Err(err) => {
                    tracing::warn!(%err, "model client failed, stopping task");
                    return TaskResult::failed(err.to_string(), turns);
                }
            };

            let index = turns.len() as u32;
            match step {
                ModelStep::Text { text } => {
                    turns.push(AgentTurn {
                        index,
                        requested_action: None,
                        action_result: None,
                        snapshot_url: last_snapshot.as_ref().map(|s| s.url.clone()),
                    });
                    return TaskResult::completed(text, turns);
                }
                ModelStep::Action { name, args } => {
                    if cancel.is_cancelled() {
                        return TaskResult::cancelled(turns);
                    }

                    let outcome = self
                        .dispatch(&session, &name, &args, last_snapshot.as_ref())
                        .await;
                    let after = session.driver().snapshot().await.ok();

                    conversation.push(ConversationItem::Action {
                        name: name.clone(),
                        args,
                        outcome: outcome.clone(),
                    });
                    if self.classifier.is_sensitive(&name) {
                        conversation.push(ConversationItem::Advisory {
                            text: format!(
                                "Note: '{name}' looks like a sensitive action (form fill, \
                                 submission, or upload). Make sure it matches the task intent."
                            ),
                        });
                    }
                    if let (Some(before), Some(after_snapshot)) = (&last_snapshot, &after) {
                        if self.overlay.was_blocked_by(before, after_snapshot) {
                            let detection = self.overlay.detect(after_snapshot);
                            conversation.push(ConversationItem::Advisory {
                                text: format!(
                                    "The last action appears to have been blocked by an overlay \
                                     ({}). {}",
                                    detection.signature, detection.suggested_action
                                ),
                            });
                        }
                    }
                    if let Some(snapshot) = &after {
                        conversation.push(ConversationItem::Page {
                            snapshot: snapshot.clone(),
                        });
                    }

                    turns.push(AgentTurn {
                        index,
                        requested_action: Some(name),
                        action_result: Some(outcome),
                        snapshot_url: after.as_ref().map(|s| s.url.clone()),
                    });
                    if after.is_some() {
                        last_snapshot = after;
                    }
                }
            }
        }

        TaskResult::truncated(turns, self.max_turns)
    }

    /// Guard and dispatch one action. Driver failures are folded into the
    /// outcome so they feed back to the model instead of ending the task.
    async fn dispatch(
        &self,
        session: &DriverSession,
        name: &str,
        args: &serde_json::Value,
        last_snapshot: Option<&Snapshot>,
    ) -> ActionOutcome {
        let current_url = last_snapshot.map(|s| s.url.clone()).unwrap_or_default();

        let action = match BrowserAction::parse(name, args) {
            Ok(action) => action,
            Err(err) => return ActionOutcome::failed(err.to_string(), current_url),
        };

        if !self.rate_limiter.record_action() {
            return ActionOutcome::failed(
                "action rate limit reached; wait before acting again",
                current_url,
            );
        }
        if action.is_navigation() && !self.rate_limiter.record_navigation() {
            return ActionOutcome::failed(
                "navigation rate limit reached; wait before navigating again",
                current_url,
            );
        }
        if let BrowserAction::Navigate { url } = &action {
            match self.url_guard.evaluate(url) {
                UrlDecision::Allowed => {}
                UrlDecision::Blocked { prefix } => {
                    return ActionOutcome::failed(
                        format!("navigation blocked: url matches denied prefix '{prefix}'"),
                        current_url,
                    );
                }
                UrlDecision::Unmatched => {
                    return ActionOutcome::failed(
                        "navigation blocked: url matches no allowed pattern",
                        current_url,
                    );
                }
            }
        }

        let driver = session.driver();
        let viewport = driver.viewport();
        let result = match &action {
            BrowserAction::Navigate { url } => driver.navigate(url).await,
            BrowserAction::ClickAt { x, y } => {
                let (px, py) = viewport.to_pixels(*x, *y);
                driver.click_at(px, py).await
            }
            BrowserAction::TypeTextAt {
                x,
                y,
                text,
                press_enter,
                clear_before_typing,
            } => {
                let (px, py) = viewport.to_pixels(*x, *y);
                driver
                    .type_text_at(px, py, text, *press_enter, *clear_before_typing)
                    .await
            }
            BrowserAction::ScrollDocument { direction, amount } => {
                driver.scroll_document(*direction, *amount).await
            }
            BrowserAction::DragAndDrop {
                x,
                y,
                dest_x,
                dest_y,
            } => {
                let (px, py) = viewport.to_pixels(*x, *y);
                let (dest_px, dest_py) = viewport.to_pixels(*dest_x, *dest_y);
                driver.drag_and_drop(px, py, dest_px, dest_py).await
            }
            BrowserAction::PageDown => driver.page_down().await,
            BrowserAction::PageUp => driver.page_up().await,
            BrowserAction::KeyCombination { keys } => driver.key_combination(keys).await,
            BrowserAction::OpenWebBrowser => {
                Ok(ActionOutcome::ok("browser is open", current_url.clone()))
            }
        };

        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(%err, action = name, "driver call failed");
                ActionOutcome::failed(err.to_string(), current_url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use async_trait::async_trait;
    use pilot_browser::{
        BrowserDriver, DriverLauncher, Result as BrowserResult, ScrollDirection, Viewport,
    };
    use pilot_guard::RateLimits;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // -- Fakes ------------------------------------------------------------

    /// Scripted model: pops the next step from a queue and keeps the last
    /// conversation it was shown.
    struct ScriptedModel {
        steps: Mutex<VecDeque<ModelStep>>,
        last_conversation: Mutex<Vec<ConversationItem>>,
    }

    impl ScriptedModel {
        fn new(steps: Vec<ModelStep>) -> Self {
            Self {
                steps: Mutex::new(steps.into_iter().collect()),
                last_conversation: Mutex::new(Vec::new()),
            }
        }

        fn action(name: &str, args: serde_json::Value) -> ModelStep {
            ModelStep::Action {
                name: name.to_string(),
                args,
            }
        }

        fn text(text: &str) -> ModelStep {
            ModelStep::Text {
                text: text.to_string(),
            }
        }

        fn seen(&self) -> Vec<ConversationItem> {
            self.last_conversation
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }
    }

    fn scripted(steps: Vec<ModelStep>) -> Arc<ScriptedModel> {
        Arc::new(ScriptedModel::new(steps))
    }

    #[async_trait]
    impl ModelClient for Arc<ScriptedModel> {
        async fn next_step(&self, conversation: &[ConversationItem]) -> crate::Result<ModelStep> {
            *self
                .last_conversation
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = conversation.to_vec();
            self.steps
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .ok_or_else(|| AgentError::Model("script exhausted".to_string()))
        }
    }

    /// Failing model for the Failed path.
    struct FailingModel;

    #[async_trait]
    impl ModelClient for FailingModel {
        async fn next_step(&self, _conversation: &[ConversationItem]) -> crate::Result<ModelStep> {
            Err(AgentError::Model("connection refused".to_string()))
        }
    }

    /// Recording driver with scriptable snapshot structures.
    #[derive(Default)]
    struct RecordingDriver {
        clicks: Mutex<Vec<(u32, u32)>>,
        navigations: Mutex<Vec<String>>,
        structures: Mutex<VecDeque<String>>,
        snapshots_taken: AtomicUsize,
    }

    impl RecordingDriver {
        fn with_structures(structures: Vec<&str>) -> Self {
            Self {
                structures: Mutex::new(structures.iter().map(|s| s.to_string()).collect()),
                ..Self::default()
            }
        }

        fn clicks(&self) -> Vec<(u32, u32)> {
            self.clicks.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        fn navigations(&self) -> Vec<String> {
            self.navigations
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }
    }

    #[async_trait]
    impl BrowserDriver for RecordingDriver {
        fn is_connected(&self) -> bool {
            true
        }

        fn viewport(&self) -> Viewport {
            Viewport {
                width: 1000,
                height: 800,
            }
        }

        async fn navigate(&self, url: &str) -> BrowserResult<ActionOutcome> {
            self.navigations
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(url.to_string());
            Ok(ActionOutcome::ok("navigated", url))
        }

        async fn click_at(&self, x: u32, y: u32) -> BrowserResult<ActionOutcome> {
            self.clicks
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((x, y));
            Ok(ActionOutcome::ok("clicked", "https://example.org"))
        }

        async fn type_text_at(
            &self,
            _x: u32,
            _y: u32,
            _text: &str,
            _press_enter: bool,
            _clear_before_typing: bool,
        ) -> BrowserResult<ActionOutcome> {
            Ok(ActionOutcome::ok("typed", "https://example.org"))
        }

        async fn scroll_document(
            &self,
            _direction: ScrollDirection,
            _amount: u32,
        ) -> BrowserResult<ActionOutcome> {
            Ok(ActionOutcome::ok("scrolled", "https://example.org"))
        }

        async fn drag_and_drop(
            &self,
            _x: u32,
            _y: u32,
            _dest_x: u32,
            _dest_y: u32,
        ) -> BrowserResult<ActionOutcome> {
            Ok(ActionOutcome::ok("dragged", "https://example.org"))
        }

        async fn page_down(&self) -> BrowserResult<ActionOutcome> {
            Ok(ActionOutcome::ok("paged down", "https://example.org"))
        }

        async fn page_up(&self) -> BrowserResult<ActionOutcome> {
            Ok(ActionOutcome::ok("paged up", "https://example.org"))
        }

        async fn key_combination(&self, _keys: &str) -> BrowserResult<ActionOutcome> {
            Ok(ActionOutcome::ok("keys sent", "https://example.org"))
        }

        async fn snapshot(&self) -> BrowserResult<Snapshot> {
            self.snapshots_taken.fetch_add(1, Ordering::SeqCst);
            let structure = self
                .structures
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .unwrap_or_else(|| "<main>page</main>".to_string());
            Ok(Snapshot {
                url: "https://example.org".to_string(),
                screenshot: None,
                structure,
                viewport: self.viewport(),
            })
        }
    }

    struct SharedLauncher(Arc<RecordingDriver>);

    #[async_trait]
    impl DriverLauncher for SharedLauncher {
        async fn launch(&self) -> BrowserResult<Arc<dyn BrowserDriver>> {
            Ok(Arc::clone(&self.0) as Arc<dyn BrowserDriver>)
        }
    }

    fn pool_for(driver: &Arc<RecordingDriver>) -> Arc<DriverPool> {
        Arc::new(DriverPool::new(Box::new(SharedLauncher(Arc::clone(driver)))))
    }

    // -- Tests ------------------------------------------------------------

    #[tokio::test]
    async fn test_completes_on_text_only_response() {
        let driver = Arc::new(RecordingDriver::default());
        let model = scripted(vec![ScriptedModel::text("all done")]);
        let agent = AgentLoop::new(Arc::clone(&model), pool_for(&driver), Arc::new(RateLimiter::default()));

        let result = agent.run("do the thing", &CancellationToken::new()).await;
        assert_eq!(result.status, TaskStatus::Completed);
        assert_eq!(result.text, "all done");
        assert!(!result.truncated);
        assert_eq!(result.turns.len(), 1);
        assert!(result.turns[0].requested_action.is_none());
    }

    #[tokio::test]
    async fn test_click_coordinates_are_mapped_to_viewport() {
        let driver = Arc::new(RecordingDriver::default());
        let model = scripted(vec![
            ScriptedModel::action("click_at", json!({"x": 500, "y": 500})),
            ScriptedModel::text("clicked it"),
        ]);
        let agent = AgentLoop::new(Arc::clone(&model), pool_for(&driver), Arc::new(RateLimiter::default()));

        let result = agent.run("click the middle", &CancellationToken::new()).await;
        assert_eq!(result.status, TaskStatus::Completed);
        // Normalized (500, 500) on a 1000x800 viewport lands at (500, 400).
        assert_eq!(driver.clicks(), vec![(500, 400)]);

        let turn = &result.turns[0];
        assert_eq!(turn.requested_action.as_deref(), Some("click_at"));
        assert!(turn.action_result.as_ref().is_some_and(|o| !o.is_error()));
    }

    #[tokio::test]
    async fn test_truncates_at_turn_cap_with_explicit_marker() {
        let driver = Arc::new(RecordingDriver::default());
        let steps: Vec<ModelStep> = (0..40)
            .map(|_| ScriptedModel::action("pagedown", json!({})))
            .collect();
        let model = scripted(steps);
        let agent = AgentLoop::new(Arc::clone(&model), pool_for(&driver), Arc::new(RateLimiter::new(
            RateLimits {
                actions_per_minute: 100,
                navigations_per_minute: 10,
            },
        )));

        let result = agent.run("scroll forever", &CancellationToken::new()).await;
        assert_eq!(result.status, TaskStatus::Truncated);
        assert!(result.truncated);
        assert_eq!(result.turns.len(), MAX_TURNS as usize);
        assert!(result.text.contains("turn cap"));
    }

    #[tokio::test]
    async fn test_cancellation_before_model_request() {
        let driver = Arc::new(RecordingDriver::default());
        let model = scripted(vec![ScriptedModel::text("never seen")]);
        let agent = AgentLoop::new(Arc::clone(&model), pool_for(&driver), Arc::new(RateLimiter::default()));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = agent.run("task", &cancel).await;
        assert_eq!(result.status, TaskStatus::Cancelled);
        assert!(result.turns.is_empty());
    }

    #[tokio::test]
    async fn test_model_error_fails_the_task() {
        let driver = Arc::new(RecordingDriver::default());
        let agent = AgentLoop::new(FailingModel, pool_for(&driver), Arc::new(RateLimiter::default()));

        let result = agent.run("task", &CancellationToken::new()).await;
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(result.text.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_blocked_navigation_feeds_error_back() {
        let driver = Arc::new(RecordingDriver::default());
        let model = scripted(vec![
            ScriptedModel::action("navigate", json!({"url": "file:///etc/passwd"})),
            ScriptedModel::text("could not open it"),
        ]);
        let agent = AgentLoop::new(Arc::clone(&model), pool_for(&driver), Arc::new(RateLimiter::default()));

        let result = agent.run("open the file", &CancellationToken::new()).await;
        assert_eq!(result.status, TaskStatus::Completed);
        // The driver never navigated.
        assert!(driver.navigations().is_empty());
        // The model saw the failure as an action outcome.
        let outcome = result.turns[0].action_result.as_ref().unwrap();
        assert!(outcome.error.as_deref().unwrap_or("").contains("blocked"));
    }

    #[tokio::test]
    async fn test_unlisted_url_is_rejected_when_patterns_configured() {
        let driver = Arc::new(RecordingDriver::default());
        let model = scripted(vec![
            ScriptedModel::action("navigate", json!({"url": "https://blocked.com"})),
            ScriptedModel::action("navigate", json!({"url": "https://sub.test.org/path"})),
            ScriptedModel::text("done"),
        ]);
        let agent = AgentLoop::new(Arc::clone(&model), pool_for(&driver), Arc::new(RateLimiter::default()))
            .with_url_guard(UrlGuard::new(&["https://*.test.org".to_string()]));

        let result = agent.run("browse", &CancellationToken::new()).await;
        assert_eq!(result.status, TaskStatus::Completed);
        assert_eq!(driver.navigations(), vec!["https://sub.test.org/path"]);
        assert!(result.turns[0]
            .action_result
            .as_ref()
            .is_some_and(ActionOutcome::is_error));
    }

    #[tokio::test]
    async fn test_rate_limited_action_is_not_dispatched() {
        let driver = Arc::new(RecordingDriver::default());
        let model = scripted(vec![
            ScriptedModel::action("click_at", json!({"x": 1, "y": 1})),
            ScriptedModel::action("click_at", json!({"x": 2, "y": 2})),
            ScriptedModel::text("done"),
        ]);
        let limiter = Arc::new(RateLimiter::new(RateLimits {
            actions_per_minute: 1,
            navigations_per_minute: 10,
        }));
        let agent = AgentLoop::new(Arc::clone(&model), pool_for(&driver), limiter);

        let result = agent.run("click twice", &CancellationToken::new()).await;
        assert_eq!(result.status, TaskStatus::Completed);
        // Only the first click reached the driver.
        assert_eq!(driver.clicks().len(), 1);
        let second = result.turns[1].action_result.as_ref().unwrap();
        assert!(second.error.as_deref().unwrap_or("").contains("rate limit"));
    }

    #[tokio::test]
    async fn test_persistent_overlay_produces_advisory() {
        let overlay_page = r#"<div role="dialog">cookie consent <button>accept</button></div>"#;
        let driver = Arc::new(RecordingDriver::with_structures(vec![
            overlay_page,
            overlay_page,
        ]));
        let model = scripted(vec![
            ScriptedModel::action("click_at", json!({"x": 500, "y": 500})),
            ScriptedModel::text("done"),
        ]);
        let agent = AgentLoop::new(Arc::clone(&model), pool_for(&driver), Arc::new(RateLimiter::default()));

        let result = agent.run("read the page", &CancellationToken::new()).await;
        assert_eq!(result.status, TaskStatus::Completed);

        // The advisory is in the conversation the model saw on its last call.
        let advisories: Vec<String> = model
            .seen()
            .iter()
            .filter_map(|item| match item {
                ConversationItem::Advisory { text } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert!(
            advisories.iter().any(|a| a.contains("blocked by an overlay")),
            "expected overlay advisory, got {advisories:?}"
        );
    }

    #[tokio::test]
    async fn test_sensitive_action_is_annotated_not_stopped() {
        let driver = Arc::new(RecordingDriver::default());
        let model = scripted(vec![
            ScriptedModel::action("key_combination", json!({"keys": "Enter"})),
            ScriptedModel::text("submitted"),
        ]);
        // Classify the key press as sensitive via a custom keyword.
        let agent = AgentLoop::new(Arc::clone(&model), pool_for(&driver), Arc::new(RateLimiter::default()))
            .with_classifier(SensitiveActionClassifier {
                keywords: vec!["key_combination".to_string()],
            });

        let result = agent.run("press enter", &CancellationToken::new()).await;
        assert_eq!(result.status, TaskStatus::Completed);
        // The action still ran.
        assert!(result.turns[0]
            .action_result
            .as_ref()
            .is_some_and(|o| !o.is_error()));
        // And the model was warned.
        assert!(model.seen().iter().any(|item| matches!(
            item,
            ConversationItem::Advisory { text } if text.contains("sensitive action")
        )));
    }

    #[tokio::test]
    async fn test_unknown_action_feeds_error_back() {
        let driver = Arc::new(RecordingDriver::default());
        let model = scripted(vec![
            ScriptedModel::action("erase_disk", json!({})),
            ScriptedModel::text("that did not work"),
        ]);
        let agent = AgentLoop::new(Arc::clone(&model), pool_for(&driver), Arc::new(RateLimiter::default()));

        let result = agent.run("task", &CancellationToken::new()).await;
        assert_eq!(result.status, TaskStatus::Completed);
        let outcome = result.turns[0].action_result.as_ref().unwrap();
        assert!(outcome.is_error());
        assert!(outcome.error.as_deref().unwrap_or("").contains("erase_disk"));
    }
}
