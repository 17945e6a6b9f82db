use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::api::BackendClient;
use crate::artifact::{self, ViewHandle};
use crate::chat::ChatSession;
use crate::config::Config;
use crate::feature::{Artifact, FeatureKind, FeatureState, FEATURES};
use crate::modal::{ModalChoice, ModalState};
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Workflow,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Prompt,
    Features,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Unknown,
    Online,
    Offline,
}

/// Transient status-line message (validation refusals, failure reasons,
/// saved-file notices). Fades after a few ticks.
#[derive(Debug)]
pub struct Flash {
    pub message: String,
    ticks_left: u8,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Prompt (the one user-entered idea every generation call carries)
    pub prompt_input: String,
    pub prompt_cursor: usize,

    // One state machine per feature card, parallel to FEATURES
    pub feature_states: Vec<FeatureState>,
    pub feature_list: ListState,

    // Chat state
    pub chat: ChatSession,
    pub chat_input: String,
    pub chat_cursor: usize,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // View/download dialog for binary artifacts
    pub modal: Option<ModalState>,

    // Transient status
    pub flash: Option<Flash>,
    pub animation_frame: u8,
    pub backend_status: BackendStatus,

    // Collaborators
    pub client: BackendClient,
    pub config: Config,
    pub events: UnboundedSender<AppEvent>,

    // Opened artifacts stay on disk while their handle lives. At most one
    // handle per kind is kept (a new view replaces the previous file); the
    // rest are released when the App drops.
    pub view_handles: Vec<ViewHandle>,
}

impl App {
    pub fn new(
        config: Config,
        client: BackendClient,
        events: UnboundedSender<AppEvent>,
        initial_prompt: Option<String>,
    ) -> Self {
        let feature_states: Vec<FeatureState> =
            FEATURES.iter().map(|d| FeatureState::new(d.kind)).collect();

        let mut feature_list = ListState::default();
        feature_list.select(Some(0));

        let prompt_input = initial_prompt.unwrap_or_default();
        let prompt_cursor = prompt_input.chars().count();

        Self {
            should_quit: false,
            screen: Screen::Workflow,
            input_mode: InputMode::Normal,
            focus: FocusPane::Features,

            prompt_input,
            prompt_cursor,

            feature_states,
            feature_list,

            chat: ChatSession::new(),
            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            modal: None,

            flash: None,
            animation_frame: 0,
            backend_status: BackendStatus::Unknown,

            client,
            config,
            events,

            view_handles: Vec::new(),
        }
    }

    /// The trimmed prompt, or None when generation must be refused locally.
    pub fn prompt(&self) -> Option<&str> {
        let trimmed = self.prompt_input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    pub fn feature(&self, kind: FeatureKind) -> &FeatureState {
        self.feature_states
            .iter()
            .find(|s| s.kind == kind)
            .expect("every registry kind has a state")
    }

    pub fn feature_mut(&mut self, kind: FeatureKind) -> &mut FeatureState {
        self.feature_states
            .iter_mut()
            .find(|s| s.kind == kind)
            .expect("every registry kind has a state")
    }

    /// The kind of the currently highlighted feature card.
    pub fn selected_kind(&self) -> Option<FeatureKind> {
        self.feature_list
            .selected()
            .and_then(|i| FEATURES.get(i))
            .map(|d| d.kind)
    }

    pub fn feature_nav_down(&mut self) {
        let len = FEATURES.len();
        if len > 0 {
            let i = self.feature_list.selected().unwrap_or(0);
            self.feature_list.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn feature_nav_up(&mut self) {
        let i = self.feature_list.selected().unwrap_or(0);
        self.feature_list.select(Some(i.saturating_sub(1)));
    }

    /// Validate the prompt and move a feature into Generating. Returns the
    /// sequence number for the request, or None when the transition was
    /// refused (empty prompt, non-generative kind, already generating).
    pub fn begin_generation(&mut self, kind: FeatureKind) -> Option<u64> {
        if self.prompt().is_none() {
            self.set_flash("Describe your idea first");
            return None;
        }
        self.feature_mut(kind).begin()
    }

    /// Apply a generation resolution. Stale sequences are dropped by the
    /// state machine; failures surface transiently and return to Idle.
    pub fn apply_generation(
        &mut self,
        kind: FeatureKind,
        seq: u64,
        outcome: Result<Artifact, String>,
    ) {
        let failure = match &outcome {
            Err(reason) => Some(reason.clone()),
            Ok(_) => None,
        };
        if self.feature_mut(kind).resolve(seq, outcome) {
            if let Some(reason) = failure {
                self.set_flash(&reason);
            }
        }
    }

    /// Apply a chat resolution. Failures become the fallback transcript
    /// entry inside the session, never an alert.
    pub fn apply_chat_reply(&mut self, result: Result<String, String>) {
        self.chat.resolve(result);
        self.scroll_chat_to_bottom();
    }

    /// Apply a fetched binary payload from the modal gateway. The feature's
    /// phase is untouched; only the dialog and the filesystem change.
    pub fn apply_artifact(
        &mut self,
        kind: FeatureKind,
        choice: ModalChoice,
        payload: Result<Vec<u8>, String>,
    ) {
        // Only a resolution for the dialog currently open counts.
        let open_for_kind = self
            .modal
            .as_ref()
            .map(|m| m.kind == kind && m.busy == Some(choice))
            .unwrap_or(false);
        if !open_for_kind {
            return;
        }

        match payload {
            Ok(bytes) => {
                let applied = match choice {
                    ModalChoice::View => ViewHandle::open(kind, &bytes).map(|handle| {
                        self.store_view_handle(handle);
                    }),
                    ModalChoice::Download => artifact::save_download(kind, &bytes).map(|path| {
                        info!(path = %path.display(), "artifact downloaded");
                        self.set_flash(&format!("Saved {}", path.display()));
                    }),
                };
                if let Err(e) = applied {
                    self.set_flash(&e.to_string());
                }
                self.modal = None;
            }
            Err(reason) => {
                self.set_flash(&reason);
                if let Some(modal) = self.modal.as_mut() {
                    modal.busy = None;
                }
            }
        }
    }

    /// Retain one handle per kind; dropping the previous handle removes its
    /// temp file.
    fn store_view_handle(&mut self, handle: ViewHandle) {
        self.view_handles.retain(|h| h.kind() != handle.kind());
        self.view_handles.push(handle);
    }

    pub fn apply_liveness(&mut self, result: Result<String, String>) {
        self.backend_status = match result {
            Ok(_) => BackendStatus::Online,
            Err(_) => BackendStatus::Offline,
        };
    }

    pub fn set_flash(&mut self, message: &str) {
        self.flash = Some(Flash {
            message: message.to_string(),
            ticks_left: 12,
        });
    }

    pub fn any_generating(&self) -> bool {
        self.feature_states
            .iter()
            .any(|s| s.phase == crate::feature::Phase::Generating)
    }

    /// Tick animation frame and fade the flash message (called by Tick).
    pub fn tick(&mut self) {
        if self.any_generating() || self.chat.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if let Some(flash) = self.flash.as_mut() {
            flash.ticks_left = flash.ticks_left.saturating_sub(1);
            if flash.ticks_left == 0 {
                self.flash = None;
            }
        }
    }

    /// Scroll the chat so the latest message (or the thinking indicator)
    /// is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in &self.chat.messages {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.chat.is_pending() {
            total_lines += 2; // Role line + thinking indicator
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{delivery, descriptor, Access, Delivery, Phase};
    use tokio::sync::mpsc;

    fn test_app(prompt: &str) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let prompt = if prompt.is_empty() { None } else { Some(prompt.to_string()) };
        App::new(Config::new(), BackendClient::new("http://localhost:5000"), tx, prompt)
    }

    #[test]
    fn empty_prompt_refuses_generation_locally() {
        let mut app = test_app("");
        assert!(app.begin_generation(FeatureKind::Roadmap).is_none());
        assert_eq!(app.feature(FeatureKind::Roadmap).phase, Phase::Idle);
        assert!(app.flash.is_some());

        app.prompt_input = "   ".to_string();
        assert!(app.begin_generation(FeatureKind::Slides).is_none());
        assert_eq!(app.feature(FeatureKind::Slides).phase, Phase::Idle);
    }

    #[test]
    fn slides_scenario_reaches_ready_with_the_link() {
        let mut app = test_app("Build a pet-sitting app");
        let seq = app.begin_generation(FeatureKind::Slides).unwrap();
        assert_eq!(app.feature(FeatureKind::Slides).phase, Phase::Generating);

        app.apply_generation(FeatureKind::Slides, seq, Ok(Artifact::Link("http://x/1".into())));
        let state = app.feature(FeatureKind::Slides);
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(
            delivery(descriptor(FeatureKind::Slides), state),
            Delivery::Redo(Access::Open("http://x/1"))
        );
    }

    #[test]
    fn failure_surfaces_transiently_and_returns_to_idle() {
        let mut app = test_app("an idea");
        let seq = app.begin_generation(FeatureKind::Video).unwrap();
        app.apply_generation(FeatureKind::Video, seq, Err("Video generation failed".into()));

        assert_eq!(app.feature(FeatureKind::Video).phase, Phase::Idle);
        assert_eq!(
            app.flash.as_ref().map(|f| f.message.as_str()),
            Some("Video generation failed")
        );
    }

    #[test]
    fn features_generate_independently() {
        let mut app = test_app("an idea");
        let slides_seq = app.begin_generation(FeatureKind::Slides).unwrap();
        let roadmap_seq = app.begin_generation(FeatureKind::Roadmap).unwrap();

        // Out-of-order completion is fine; no cross-feature coupling.
        app.apply_generation(
            FeatureKind::Roadmap,
            roadmap_seq,
            Ok(Artifact::Document { text: "an idea".into() }),
        );
        assert_eq!(app.feature(FeatureKind::Roadmap).phase, Phase::Ready);
        assert_eq!(app.feature(FeatureKind::Slides).phase, Phase::Generating);

        app.apply_generation(FeatureKind::Slides, slides_seq, Err("boom".into()));
        assert_eq!(app.feature(FeatureKind::Slides).phase, Phase::Idle);
        assert_eq!(app.feature(FeatureKind::Roadmap).phase, Phase::Ready);
    }

    #[test]
    fn artifact_fetch_never_mutates_phase() {
        let mut app = test_app("an idea");
        let seq = app.begin_generation(FeatureKind::Roadmap).unwrap();
        app.apply_generation(
            FeatureKind::Roadmap,
            seq,
            Ok(Artifact::Document { text: "an idea".into() }),
        );

        app.modal = Some(ModalState::open(FeatureKind::Roadmap, "an idea".into()));
        app.modal.as_mut().unwrap().commit();
        app.apply_artifact(FeatureKind::Roadmap, ModalChoice::View, Err("fetch failed".into()));

        assert_eq!(app.feature(FeatureKind::Roadmap).phase, Phase::Ready);
        // Dialog stays open after a failed fetch, ready for another attempt.
        assert!(app.modal.is_some());
        assert!(app.modal.as_ref().unwrap().busy.is_none());
    }

    #[test]
    fn a_new_view_replaces_the_previous_handle_for_the_same_kind() {
        let mut app = test_app("an idea");
        let first = ViewHandle::stage(FeatureKind::Roadmap, b"%PDF-1.4").unwrap();
        let first_path = first.path().to_path_buf();
        app.store_view_handle(first);
        app.store_view_handle(ViewHandle::stage(FeatureKind::Roadmap, b"%PDF-1.5").unwrap());

        assert_eq!(app.view_handles.len(), 1);
        assert!(!first_path.exists());

        // A different kind keeps its own handle.
        app.store_view_handle(ViewHandle::stage(FeatureKind::Video, &[0u8; 4]).unwrap());
        assert_eq!(app.view_handles.len(), 2);
    }

    #[test]
    fn artifact_resolution_without_a_matching_dialog_is_ignored() {
        let mut app = test_app("an idea");
        app.apply_artifact(FeatureKind::Roadmap, ModalChoice::Download, Ok(vec![1, 2, 3]));
        assert!(app.modal.is_none());
        assert!(app.flash.is_none());
    }

    #[test]
    fn chat_failure_lands_in_the_transcript_not_the_flash_line() {
        let mut app = test_app("an idea");
        app.chat.submit("Hi").unwrap();
        app.apply_chat_reply(Err("connection refused".into()));

        assert_eq!(app.chat.messages.len(), 2);
        assert!(app.flash.is_none());
    }

    #[test]
    fn flash_fades_after_its_ticks() {
        let mut app = test_app("an idea");
        app.set_flash("note");
        for _ in 0..12 {
            assert!(app.flash.is_some());
            app.tick();
        }
        assert!(app.flash.is_none());
    }
}
