use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tracing::debug;

use crate::app::{App, FocusPane, InputMode, Screen};
use crate::artifact;
use crate::feature::{delivery, descriptor, Access, Artifact, Delivery, FeatureKind};
use crate::modal::ModalState;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
        AppEvent::Generation { kind, seq, outcome } => {
            app.apply_generation(kind, seq, outcome);
        }
        AppEvent::ChatReply(result) => app.apply_chat_reply(result),
        AppEvent::ArtifactFetched { kind, choice, payload } => {
            app.apply_artifact(kind, choice, payload);
        }
        AppEvent::Liveness(result) => app.apply_liveness(result),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    // The view/download dialog captures all input while open.
    if app.modal.is_some() {
        handle_modal_key(app, key);
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Workflow => handle_workflow_normal(app, key),
        Screen::Chat => handle_chat_normal(app, key),
    }
}

fn handle_workflow_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Card navigation
        KeyCode::Char('j') | KeyCode::Down => app.feature_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.feature_nav_up(),

        // Trigger the selected card (generate, redo, open chat)
        KeyCode::Enter | KeyCode::Char('g') => {
            if let Some(kind) = app.selected_kind() {
                trigger_card(app, kind);
            }
        }

        // Access the selected card's ready artifact
        KeyCode::Char('o') => {
            if let Some(kind) = app.selected_kind() {
                open_access(app, kind);
            }
        }

        // Edit the idea prompt
        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.focus = FocusPane::Prompt;
            app.input_mode = InputMode::Editing;
            app.prompt_cursor = app.prompt_input.chars().count();
        }

        // Jump to the chat assistant
        KeyCode::Char('a') => enter_chat(app),

        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        // Back to the workflow
        KeyCode::Esc => {
            app.screen = Screen::Workflow;
            app.focus = FocusPane::Features;
        }

        // Scroll the transcript
        KeyCode::Char('j') | KeyCode::Down => {
            app.chat_scroll = app.chat_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.chat_scroll = app.chat_scroll.saturating_sub(1);
        }
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        // Type a message
        KeyCode::Char('i') => {
            app.input_mode = InputMode::Editing;
            app.chat_cursor = app.chat_input.chars().count();
        }

        _ => {}
    }
}

fn handle_modal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        // Esc always closes, even mid-fetch; the late payload finds no
        // matching dialog and is dropped.
        KeyCode::Esc => app.modal = None,
        KeyCode::Char('j') | KeyCode::Char('k') | KeyCode::Down | KeyCode::Up
        | KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
            if let Some(modal) = app.modal.as_mut() {
                modal.toggle();
            }
        }
        KeyCode::Enter => {
            let committed = app
                .modal
                .as_mut()
                .and_then(|m| m.commit().map(|choice| (m.kind, m.text.clone(), choice)));
            if let Some((kind, text, choice)) = committed {
                spawn_artifact_fetch(app, kind, text, choice);
            }
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Workflow => handle_prompt_editing(app, key),
        Screen::Chat => handle_chat_editing(app, key),
    }
}

fn handle_prompt_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Features;
        }
        KeyCode::Backspace => {
            if app.prompt_cursor > 0 {
                app.prompt_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.prompt_input, app.prompt_cursor);
                app.prompt_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.prompt_input.chars().count();
            if app.prompt_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.prompt_input, app.prompt_cursor);
                app.prompt_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.prompt_cursor = app.prompt_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.prompt_input.chars().count();
            app.prompt_cursor = (app.prompt_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.prompt_cursor = 0,
        KeyCode::End => app.prompt_cursor = app.prompt_input.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.prompt_input, app.prompt_cursor);
            app.prompt_input.insert(byte_pos, c);
            app.prompt_cursor += 1;
        }
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => submit_chat_turn(app),
        KeyCode::Backspace => {
            if app.chat_cursor > 0 {
                app.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.chat_input.chars().count();
            if app.chat_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.chat_input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.chat_cursor = 0,
        KeyCode::End => app.chat_cursor = app.chat_input.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
            app.chat_input.insert(byte_pos, c);
            app.chat_cursor += 1;
        }
        _ => {}
    }
}

fn enter_chat(app: &mut App) {
    app.screen = Screen::Chat;
    app.input_mode = InputMode::Editing;
    app.chat_cursor = app.chat_input.chars().count();
}

/// Dispatch the selected card by kind: generative kinds start or restart a
/// request, the chat card switches surfaces, passive cards do nothing.
fn trigger_card(app: &mut App, kind: FeatureKind) {
    match kind {
        FeatureKind::Chat => enter_chat(app),
        FeatureKind::Passive => {}
        _ => spawn_generation(app, kind),
    }
}

/// Start one generation request. The state machine refuses overlapping
/// requests and the empty prompt; the eventual resolution comes back through
/// the event channel tagged with the sequence number handed out here.
fn spawn_generation(app: &mut App, kind: FeatureKind) {
    let Some(seq) = app.begin_generation(kind) else {
        return;
    };
    // begin_generation validated the prompt.
    let prompt = app.prompt().unwrap_or_default().to_string();
    let endpoint = descriptor(kind).endpoint;
    let author = app.config.author.clone();
    let include_images = app.config.include_images;
    let client = app.client.clone();
    let events = app.events.clone();
    debug!(?kind, seq, "generation started");

    tokio::spawn(async move {
        let outcome = match kind {
            FeatureKind::Slides => client
                .create_slides(&prompt, author.as_deref(), include_images)
                .await
                .map(Artifact::Link),
            FeatureKind::Video | FeatureKind::Roadmap => client
                .fetch_document(endpoint, &prompt, false)
                .await
                .map(|_| Artifact::Document { text: prompt }),
            FeatureKind::Network => client
                .find_investors(&prompt)
                .await
                .map(|value| Artifact::Report(report_text(&value))),
            FeatureKind::Chat | FeatureKind::Passive => return,
        };
        let outcome = outcome.map_err(|e| e.to_string());
        let _ = events.send(AppEvent::Generation { kind, seq, outcome });
    });
}

/// Perform the kind-fixed access action of a ready feature.
fn open_access(app: &mut App, kind: FeatureKind) {
    let mut link = None;
    let mut artifact_text = None;
    match delivery(descriptor(kind), app.feature(kind)) {
        Delivery::Redo(Access::Open(url)) => link = Some(url.to_string()),
        Delivery::Redo(Access::Reveal(text)) => artifact_text = Some(text.to_string()),
        // Reports render inline in the detail pane; nothing to launch.
        Delivery::Redo(Access::Show(_)) => {}
        _ => {}
    }

    if let Some(text) = artifact_text {
        app.modal = Some(ModalState::open(kind, text));
    }
    if let Some(url) = link {
        if let Err(e) = artifact::open_url(&url) {
            app.set_flash(&e.to_string());
        }
    }
}

/// Fetch the binary payload for a committed modal action. View and download
/// hit the same endpoint; only the download flag differs. `text` is the
/// dialog's snapshot of the prompt that produced the artifact, so the fetch
/// retrieves that artifact even after the prompt is edited.
fn spawn_artifact_fetch(app: &mut App, kind: FeatureKind, text: String, choice: crate::modal::ModalChoice) {
    let endpoint = descriptor(kind).endpoint;
    let client = app.client.clone();
    let events = app.events.clone();
    debug!(?kind, ?choice, "artifact fetch started");

    tokio::spawn(async move {
        let payload = client
            .fetch_document(endpoint, &text, choice.download_flag())
            .await
            .map_err(|e| e.to_string());
        let _ = events.send(AppEvent::ArtifactFetched { kind, choice, payload });
    });
}

/// Submit one chat turn: the session appends the user message and snapshots
/// the prior history; the reply (or the fixed fallback) is appended when the
/// request resolves.
fn submit_chat_turn(app: &mut App) {
    let Some(turn) = app.chat.submit(&app.chat_input) else {
        return;
    };
    app.chat_input.clear();
    app.chat_cursor = 0;
    app.scroll_chat_to_bottom();

    let business_idea = app.prompt().unwrap_or_default().to_string();
    let client = app.client.clone();
    let events = app.events.clone();

    tokio::spawn(async move {
        let result = client
            .chat(&turn.message, &business_idea, &turn.history)
            .await
            .map_err(|e| e.to_string());
        let _ = events.send(AppEvent::ChatReply(result));
    });
}

/// Render an unconstrained investor-network response as a text report.
fn report_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => match app.screen {
            Screen::Workflow => app.feature_nav_down(),
            Screen::Chat => app.chat_scroll = app.chat_scroll.saturating_add(3),
        },
        MouseEventKind::ScrollUp => match app.screen {
            Screen::Workflow => app.feature_nav_up(),
            Screen::Chat => app.chat_scroll = app.chat_scroll.saturating_sub(3),
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BackendClient;
    use crate::config::Config;
    use crate::modal::ModalChoice;

    fn test_app(prompt: &str) -> App {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        App::new(
            Config::new(),
            BackendClient::new("http://localhost:5000"),
            tx,
            Some(prompt.to_string()),
        )
    }

    #[test]
    fn modal_fetches_carry_the_text_that_produced_the_artifact() {
        let mut app = test_app("original idea");
        let seq = app.begin_generation(FeatureKind::Roadmap).unwrap();
        app.apply_generation(
            FeatureKind::Roadmap,
            seq,
            Ok(Artifact::Document { text: "original idea".into() }),
        );

        // The prompt is edited (here: cleared) after the artifact became
        // ready; the dialog must still target the generated artifact.
        app.prompt_input.clear();
        open_access(&mut app, FeatureKind::Roadmap);

        assert_eq!(app.modal.as_ref().unwrap().text, "original idea");
    }

    #[test]
    fn esc_abandons_an_outstanding_fetch() {
        let mut app = test_app("an idea");
        app.modal = Some(ModalState::open(FeatureKind::Video, "an idea".into()));
        app.modal.as_mut().unwrap().commit();

        handle_modal_key(&mut app, KeyEvent::from(KeyCode::Esc));
        assert!(app.modal.is_none());

        // The late payload has no matching dialog and is dropped.
        app.apply_artifact(FeatureKind::Video, ModalChoice::View, Ok(vec![0]));
        assert!(app.view_handles.is_empty());
    }

    #[test]
    fn char_to_byte_index_handles_multibyte() {
        let s = "héllo";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 99), s.len());
    }

    #[test]
    fn report_text_unwraps_plain_strings() {
        assert_eq!(report_text(&serde_json::json!("three angels")), "three angels");
        let report = report_text(&serde_json::json!({"investors": ["a", "b"]}));
        assert!(report.contains("investors"));
    }
}
