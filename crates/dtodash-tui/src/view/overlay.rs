use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::App;
use crate::view::{centered_rect, truncate};

const TOAST_WIDTH: u16 = 48;

/// Path prompt shown while choosing a document to upload.
pub fn render_upload_prompt(f: &mut Frame, app: &App) {
    let theme = &app.theme;
    let area = f.area();
    let popup = centered_rect(area.width.saturating_sub(8).min(72), 6, area);

    let lines = vec![
        Line::from(Span::styled(
            "PDF, DOC or DOCX, up to 10 MB",
            Style::default().fg(theme.dim),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(theme.active)),
            Span::styled(format!("{}▏", app.input), Style::default().fg(theme.text)),
        ]),
    ];

    let prompt = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.active))
            .title(" Upload document (Enter to send, Esc to cancel) "),
    );
    f.render_widget(Clear, popup);
    f.render_widget(prompt, popup);
}

/// Stack of recent notifications in the top-right corner.
pub fn render_toasts(f: &mut Frame, app: &App) {
    let theme = &app.theme;
    let area = f.area();
    if app.toasts.is_empty() || area.width < TOAST_WIDTH + 2 {
        return;
    }

    let mut y = area.y + 1;
    for toast in app.toasts.iter().collect::<Vec<_>>().into_iter().rev() {
        let height = 4;
        if y + height > area.y + area.height {
            break;
        }
        let rect = Rect::new(area.x + area.width - TOAST_WIDTH - 1, y, TOAST_WIDTH, height);
        let n = &toast.notification;
        let color = theme.notification_color(n.level);
        let body = Paragraph::new(Line::from(Span::styled(
            n.description.clone(),
            Style::default().fg(theme.text),
        )))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(Span::styled(
                    format!(" {} ", truncate(&n.title, TOAST_WIDTH as usize - 4)),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
        );
        f.render_widget(Clear, rect);
        f.render_widget(body, rect);
        y += height;
    }
}
