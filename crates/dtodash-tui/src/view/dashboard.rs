use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

use dtodash_core::rows::format_ingested_at;
use dtodash_core::{Stage, StageStatus};

use crate::app::App;
use crate::theme::Theme;
use crate::view::{spinner_char, truncate};

/// Render the Dashboard screen.
pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::vertical([
        Constraint::Length(1), // header
        Constraint::Length(4), // stat cards
        Constraint::Length(5), // pipeline
        Constraint::Min(5),    // table
        Constraint::Length(1), // footer
    ])
    .split(area);

    render_header(f, chunks[0], app);
    render_stats(f, chunks[1], app);
    render_pipeline(f, chunks[2], app);
    render_table(f, chunks[3], app);
    render_footer(f, chunks[4], &app.theme);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let mut spans = vec![
        Span::styled(" DTODASH ", theme.header_style()),
        Span::styled(
            " Dashboard",
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
    ];
    if app.dashboard.loading {
        spans.push(Span::styled(
            format!("  {} refreshing", spinner_char(app.tick)),
            Style::default().fg(theme.spinner),
        ));
    }
    if let Some(err) = &app.dashboard.error {
        spans.push(Span::styled(
            format!("  {err}"),
            Style::default().fg(theme.failure),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_stats(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let stats = &app.dashboard.stats;
    let cards = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .split(area);

    stat_card(
        f,
        cards[0],
        "Documents processed",
        stats.total.to_string(),
        "Tracked in the catalog".to_string(),
        theme.text,
        theme,
    );
    stat_card(
        f,
        cards[1],
        "Success rate",
        format!("{}%", stats.success_rate),
        format!("{} successful DTOs", stats.success_count),
        theme.success,
        theme,
    );
    stat_card(
        f,
        cards[2],
        "Last ingestion",
        stats.latest_ingested.display(),
        "Live from blob intake".to_string(),
        theme.warning,
        theme,
    );
}

fn stat_card(
    f: &mut Frame,
    area: Rect,
    label: &str,
    value: String,
    helper: String,
    accent: Color,
    theme: &Theme,
) {
    let lines = vec![
        Line::from(Span::styled(
            value,
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(helper, Style::default().fg(theme.dim))),
    ];
    let card = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style())
            .title(format!(" {label} ")),
    );
    f.render_widget(card, area);
}

fn render_pipeline(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let lines: Vec<Line> = Stage::ALL
        .iter()
        .map(|&stage| {
            let status = app.pipeline.stage(stage);
            let marker = match status {
                StageStatus::Idle => '○',
                StageStatus::Running => spinner_char(app.tick),
                StageStatus::Ready => '✓',
            };
            Line::from(vec![
                Span::styled(format!(" {marker} "), theme.stage_style(status)),
                Span::styled(
                    format!("{:<28}", stage.label()),
                    Style::default().fg(theme.text),
                ),
                Span::styled(format!("{:<10}", status.label()), theme.stage_style(status)),
                Span::styled(stage.detail(), Style::default().fg(theme.dim)),
            ])
        })
        .collect();

    let title = match (&app.uploading, &app.pipeline_file) {
        (Some(name), _) => format!(" Pipeline: uploading {name} "),
        (None, Some(name)) => format!(" Pipeline: {name} "),
        (None, None) => " Pipeline ".to_string(),
    };
    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style())
            .title(title),
    );
    f.render_widget(panel, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(format!(" DTO inventory ({}) ", app.dashboard.rows.len()));

    if app.dashboard.show_loading() || app.dashboard.is_empty() {
        let text = if app.dashboard.show_loading() {
            format!("{} Loading DTOs...", spinner_char(app.tick))
        } else {
            "No DTOs available yet. Upload a document to populate the feed.".to_string()
        };
        let placeholder = Paragraph::new(Line::from(Span::styled(
            text,
            Style::default().fg(theme.dim),
        )))
        .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let header = Row::new(["File", "Type", "Status", "Ingested"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD))
    }))
    .height(1);

    let name_width = (area.width as usize).saturating_sub(42);
    let rows: Vec<Row> = app
        .dashboard
        .rows
        .iter()
        .map(|row| {
            let ingested = row
                .ingested_at
                .as_deref()
                .map(format_ingested_at)
                .unwrap_or_else(|| "—".to_string());
            Row::new(vec![
                Cell::from(truncate(&row.file_name, name_width)),
                Cell::from(row.file_type.to_uppercase()).style(Style::default().fg(theme.dim)),
                Cell::from(row.dto_result.label())
                    .style(Style::default().fg(theme.result_color(row.dto_result))),
                Cell::from(ingested),
            ])
        })
        .collect();

    let widths = [
        Constraint::Min(15),
        Constraint::Length(8),
        Constraint::Length(9),
        Constraint::Length(20),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(theme.highlight_style());

    let mut state = TableState::default();
    state.select(Some(app.cursor));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_footer(f: &mut Frame, area: Rect, theme: &Theme) {
    let footer = Line::from(Span::styled(
        " j/k:nav  Enter:details  u:upload  x:clear  r:refresh  ?:help  q:quit",
        theme.footer_style(),
    ));
    f.render_widget(Paragraph::new(footer), area);
}
