use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, BackendStatus, FocusPane, InputMode, Screen};
use crate::chat::ChatRole;
use crate::feature::{delivery, Access, Delivery, FeatureState, Phase, FEATURES};
use crate::modal::{ModalChoice, MODAL_CHOICES};

/// Parse a line of text and convert **bold** markdown to styled spans
/// (assistant replies tend to arrive with markdown emphasis).
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut current_text = String::new();

    while let Some((_, c)) = chars.next() {
        if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
            // Consume the second *
            chars.next();

            // Push any accumulated plain text
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some((_, c)) = chars.next() {
                if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
                    chars.next(); // consume second *
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Workflow => render_workflow_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.modal.is_some() {
        render_modal(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status_text, status_color) = match app.backend_status {
        BackendStatus::Online => ("● online", Color::Green),
        BackendStatus::Offline => ("● offline", Color::Red),
        BackendStatus::Unknown => ("● connecting", Color::Yellow),
    };

    let title = Line::from(vec![
        Span::styled(" PitchDesk ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // A transient flash message takes the whole line.
    if let Some(flash) = &app.flash {
        let line = Paragraph::new(Span::styled(
            format!(" {} ", flash.message),
            Style::default().bg(Color::Black).fg(Color::Yellow),
        ))
        .style(Style::default().bg(Color::Black));
        frame.render_widget(line, area);
        return;
    }

    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Workflow => " WORKFLOW ",
        Screen::Chat => " CHAT ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.modal.is_some() {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" choose ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" confirm ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else {
        match (app.screen, app.input_mode) {
            (Screen::Workflow, InputMode::Normal) => vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" cards ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" generate/redo ", label_style),
                Span::styled(" o ", key_style),
                Span::styled(" open ", label_style),
                Span::styled(" i ", key_style),
                Span::styled(" idea ", label_style),
                Span::styled(" a ", key_style),
                Span::styled(" chat ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ],
            (Screen::Workflow, InputMode::Editing) => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" done ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" done ", label_style),
            ],
            (Screen::Chat, InputMode::Normal) => vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" workflow ", label_style),
            ],
            (Screen::Chat, InputMode::Editing) => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" stop typing ", label_style),
            ],
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_workflow_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [prompt_area, main_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    render_prompt_input(app, frame, prompt_area);

    let [cards_area, detail_area] = Layout::horizontal([
        Constraint::Length(34),
        Constraint::Min(0),
    ])
    .areas(main_area);

    render_feature_cards(app, frame, cards_area);
    render_feature_detail(app, frame, detail_area);
}

fn render_prompt_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.focus == FocusPane::Prompt;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Your Idea (i to edit) ");

    // Horizontal scroll keeps the cursor visible in long prompts.
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.prompt_cursor >= inner_width {
        app.prompt_cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .prompt_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (app.prompt_cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn phase_badge(state: &FeatureState, animation_frame: u8) -> Span<'static> {
    match state.phase {
        Phase::Idle => Span::styled("  generate", Style::default().fg(Color::DarkGray)),
        Phase::Generating => {
            let dots = ".".repeat((animation_frame as usize) + 1);
            Span::styled(
                format!("  working{dots}"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )
        }
        Phase::Ready => Span::styled("  ready", Style::default().fg(Color::Green).bold()),
    }
}

fn render_feature_cards(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Features ");

    let items: Vec<ListItem> = FEATURES
        .iter()
        .map(|desc| {
            let state = app.feature(desc.kind);
            let color = if state.phase == Phase::Generating {
                desc.loading_color
            } else {
                desc.color
            };
            let mut spans = vec![Span::styled(
                format!(" {} {}", desc.icon, desc.name),
                Style::default().fg(color),
            )];
            if desc.kind.is_generative() {
                spans.push(phase_badge(state, app.animation_frame));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.feature_list);
}

fn render_feature_detail(app: &App, frame: &mut Frame, area: Rect) {
    let Some(kind) = app.selected_kind() else {
        return;
    };
    let desc = crate::feature::descriptor(kind);
    let state = app.feature(kind);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", desc.name));

    let mut lines: Vec<Line> = Vec::new();

    match delivery(desc, state) {
        Delivery::Generate => {
            lines.push(Line::from("Press Enter to generate from your idea."));
            if let Some(err) = &state.last_error {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    format!("Last attempt failed: {err}"),
                    Style::default().fg(Color::Red),
                )));
            }
        }
        Delivery::Busy => {
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Generating{dots}"),
                Style::default().fg(desc.loading_color).add_modifier(Modifier::ITALIC),
            )));
        }
        Delivery::Redo(access) => {
            match access {
                Access::Open(url) => {
                    lines.push(Line::from(vec![
                        Span::styled("Ready: ", Style::default().fg(Color::Green).bold()),
                        Span::styled(url.to_string(), Style::default().fg(desc.color)),
                    ]));
                    lines.push(Line::default());
                    lines.push(Line::from(Span::styled(
                        "o opens the link, Enter regenerates.",
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                Access::Reveal(_) => {
                    lines.push(Line::from(Span::styled(
                        "Artifact ready.",
                        Style::default().fg(Color::Green).bold(),
                    )));
                    lines.push(Line::default());
                    lines.push(Line::from(Span::styled(
                        "o opens view/download, Enter regenerates.",
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                Access::Show(report) => {
                    lines.push(Line::from(Span::styled(
                        "Report ready. Enter regenerates.",
                        Style::default().fg(Color::Green).bold(),
                    )));
                    lines.push(Line::default());
                    for line in report.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
            }
        }
        Delivery::None => {
            let hint = match kind {
                crate::feature::FeatureKind::Chat => "Press Enter to chat about your idea.",
                _ => "Nothing to do here.",
            };
            lines.push(Line::from(hint));
        }
    }

    let detail = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(detail, area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chat Assistant ");

    let chat_text = if app.chat.messages.is_empty() && !app.chat.is_pending() {
        Text::from(Span::styled(
            "Ask anything about your business idea...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.chat.messages {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(msg.content.as_str()));
                    lines.push(Line::default());
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                    lines.push(Line::default());
                }
            }
        }

        if app.chat.is_pending() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{dots}"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    // Input at the bottom
    let editing = app.input_mode == InputMode::Editing;
    let input_border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let title = if app.chat.is_pending() {
        " Waiting for reply... "
    } else {
        " Message (i to type) "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(title);

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.chat_cursor >= inner_width {
        app.chat_cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .chat_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, input_area);

    if editing {
        let cursor_x = (app.chat_cursor - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

fn render_modal(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(modal) = app.modal.as_ref() else {
        return;
    };
    let desc = crate::feature::descriptor(modal.kind);

    let popup_width = 44.min(area.width.saturating_sub(4));
    let popup_height = 6.min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(desc.color))
        .title(format!(" {} ", desc.name));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut lines: Vec<Line> = Vec::new();
    if let Some(busy) = modal.busy {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}ing{dots}", busy.label()),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else {
        for choice in MODAL_CHOICES {
            let selected = choice == modal.selected;
            let marker = if selected { "> " } else { "  " };
            let style = if selected {
                Style::default().bg(Color::Blue).fg(Color::White).bold()
            } else {
                Style::default()
            };
            let label = match choice {
                ModalChoice::View => "View in an external viewer".to_string(),
                ModalChoice::Download => format!(
                    "Download as {}",
                    modal.kind.download_filename().unwrap_or("file")
                ),
            };
            lines.push(Line::from(Span::styled(format!("{marker}{label}"), style)));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "The artifact is fetched fresh each time.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let body = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    frame.render_widget(body, inner);
}
