use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use dtodash_core::{DtoDetails, ParamKind, Sender};

use crate::app::App;
use crate::input::InputMode;
use crate::theme::Theme;
use crate::view::{spinner_char, truncate};

/// Render the DTO Details screen.
pub fn render(f: &mut Frame, app: &App) {
    let theme = &app.theme;
    let area = f.area();

    let chunks = Layout::vertical([
        Constraint::Length(1), // breadcrumb
        Constraint::Min(5),    // content
        Constraint::Length(3), // chat input
        Constraint::Length(1), // footer
    ])
    .split(area);

    let Some(details) = app.current_details() else {
        render_breadcrumb(f, chunks[0], "—", theme);
        let missing = Paragraph::new(Line::from(Span::styled(
            "  DTO not found.",
            Style::default().fg(theme.dim),
        )))
        .block(Block::default().borders(Borders::ALL).border_style(theme.border_style()));
        f.render_widget(missing, chunks[1]);
        render_footer(f, chunks[3], theme);
        return;
    };

    render_breadcrumb(f, chunks[0], &details.file_name, theme);

    let body = Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    render_record(f, body[0], app, &details);
    render_chat(f, body[1], app);
    render_input(f, chunks[2], app);
    render_footer(f, chunks[3], theme);
}

fn render_breadcrumb(f: &mut Frame, area: Rect, file_name: &str, theme: &Theme) {
    let breadcrumb = Line::from(vec![
        Span::styled(" DTODASH ", theme.header_style()),
        Span::styled(" > ", Style::default().fg(theme.dim)),
        Span::styled(
            truncate(file_name, (area.width as usize).saturating_sub(16)),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(Paragraph::new(breadcrumb), area);
}

fn render_record(f: &mut Frame, area: Rect, app: &App, details: &DtoDetails) {
    let theme = &app.theme;
    let mut lines: Vec<Line> = Vec::new();

    section_header(&mut lines, "CONTEXT", theme);
    labeled_line(&mut lines, "ID", &details.id, theme);
    labeled_line(&mut lines, "File type", &details.file_type, theme);
    labeled_line(&mut lines, "Ingested", &details.ingested_at, theme);
    if let Some(blob) = &details.source_blob {
        labeled_line(&mut lines, "Source blob", blob, theme);
    }
    labeled_line(
        &mut lines,
        "Extraction",
        &percent_or_dash(details.extraction_percentage),
        theme,
    );
    labeled_line(
        &mut lines,
        "OCR confidence",
        &percent_or_dash(details.ocr_percentage),
        theme,
    );

    lines.push(Line::from(""));
    section_header(&mut lines, "PARAMETERS", theme);
    if details.parameters.is_empty() {
        dim_line(&mut lines, "No parameters extracted.", theme);
    }
    for param in &details.parameters {
        let mut spans = vec![
            Span::styled(
                format!("  {} ", kind_marker(param.kind)),
                Style::default().fg(theme.active),
            ),
            Span::styled(format!("{:<24}", param.label), Style::default().fg(theme.dim)),
            Span::styled(param.value.clone(), Style::default().fg(theme.text)),
        ];
        if let Some(confidence) = param.confidence {
            spans.push(Span::styled(
                format!("  ({:.0}%)", confidence * 100.0),
                Style::default().fg(theme.dim),
            ));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    section_header(&mut lines, "OCR FIELDS", theme);
    if details.ocr_fields.is_empty() {
        dim_line(&mut lines, "No OCR text captured.", theme);
    }
    for field in details.ocr_preview() {
        lines.push(Line::from(Span::styled(
            format!("  - {field}"),
            Style::default().fg(theme.text),
        )));
    }
    if details.has_more_ocr_fields() {
        dim_line(
            &mut lines,
            &format!(
                "… {} more",
                details.ocr_fields.len() - details.ocr_preview().len()
            ),
            theme,
        );
    }

    lines.push(Line::from(""));
    section_header(&mut lines, "AI DESCRIPTION", theme);
    text_block(&mut lines, &details.description, theme);
    lines.push(Line::from(""));
    section_header(&mut lines, "MOTIVATION", theme);
    text_block(&mut lines, &details.motivation, theme);

    let scroll = app
        .detail_scroll
        .min(lines.len().saturating_sub(1).min(u16::MAX as usize) as u16);
    let content = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style()),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(content, area);
}

fn render_chat(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let mut lines: Vec<Line> = Vec::new();

    if app.chat.is_empty() {
        dim_line(&mut lines, "Ask a question about this DTO (c).", theme);
    }
    for msg in app.chat.messages() {
        let (who, color) = match msg.sender {
            Sender::User => ("you", theme.active),
            Sender::Assistant => ("ai", theme.success),
        };
        let style = Style::default().fg(color).add_modifier(Modifier::BOLD);
        lines.push(Line::from(Span::styled(format!(" {who}:"), style)));
        for text_line in msg.text.lines() {
            lines.push(Line::from(Span::styled(
                format!("   {text_line}"),
                Style::default().fg(theme.text),
            )));
        }
    }
    if app.chat.is_pending() {
        lines.push(Line::from(Span::styled(
            format!(" {} thinking...", spinner_char(app.tick)),
            Style::default().fg(theme.spinner),
        )));
    }

    // Keep the newest messages in view.
    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(inner_height) as u16;
    let chat = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style())
                .title(" Assistant "),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(chat, area);
}

fn render_input(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let editing = app.input_mode == InputMode::Chat;
    let (text, style) = if editing {
        (format!("{}▏", app.input), Style::default().fg(theme.text))
    } else {
        (
            "Press c to ask the assistant".to_string(),
            Style::default().fg(theme.dim),
        )
    };
    let border = if editing {
        Style::default().fg(theme.active)
    } else {
        theme.border_style()
    };
    let input = Paragraph::new(Line::from(Span::styled(text, style))).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(" Question "),
    );
    f.render_widget(input, area);
}

fn render_footer(f: &mut Frame, area: Rect, theme: &Theme) {
    let footer = Line::from(Span::styled(
        " j/k:scroll  c:ask  Enter:send  Esc:back  ?:help  q:quit",
        theme.footer_style(),
    ));
    f.render_widget(Paragraph::new(footer), area);
}

fn kind_marker(kind: ParamKind) -> char {
    match kind {
        ParamKind::Current => '⚡',
        ParamKind::Poles => '◎',
        ParamKind::Type => '◆',
        ParamKind::Confidence => '%',
        ParamKind::Other => '•',
    }
}

fn percent_or_dash(value: Option<u8>) -> String {
    value.map(|v| format!("{v}%")).unwrap_or_else(|| "—".to_string())
}

fn section_header<'a>(lines: &mut Vec<Line<'a>>, title: &'a str, theme: &Theme) {
    lines.push(Line::from(Span::styled(
        format!("  {title}"),
        Style::default()
            .fg(theme.active)
            .add_modifier(Modifier::BOLD),
    )));
}

fn labeled_line(lines: &mut Vec<Line<'_>>, label: &str, value: &str, theme: &Theme) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {label:<16}"), Style::default().fg(theme.dim)),
        Span::styled(value.to_string(), Style::default().fg(theme.text)),
    ]));
}

fn dim_line(lines: &mut Vec<Line<'_>>, text: &str, theme: &Theme) {
    lines.push(Line::from(Span::styled(
        format!("  {text}"),
        Style::default().fg(theme.dim),
    )));
}

fn text_block(lines: &mut Vec<Line<'_>>, text: &str, theme: &Theme) {
    for line in text.lines() {
        lines.push(Line::from(Span::styled(
            format!("  {line}"),
            Style::default().fg(theme.text),
        )));
    }
}
