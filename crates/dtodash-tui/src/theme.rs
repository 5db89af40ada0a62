use ratatui::style::{Color, Modifier, Style};

use dtodash_core::{DtoResult, NotificationLevel, StageStatus};

/// Color theme for the TUI.
pub struct Theme {
    pub success: Color,
    pub failure: Color,
    pub warning: Color,
    pub info: Color,

    pub header_fg: Color,
    pub header_bg: Color,
    pub border: Color,
    pub text: Color,
    pub dim: Color,
    pub highlight_bg: Color,
    pub active: Color,
    pub idle: Color,
    pub spinner: Color,
    pub footer_fg: Color,
    pub footer_bg: Color,
}

impl Theme {
    /// Blue-accented terminal theme.
    pub fn dashboard() -> Self {
        Self {
            success: Color::Green,
            failure: Color::Red,
            warning: Color::Yellow,
            info: Color::Cyan,

            header_fg: Color::Black,
            header_bg: Color::LightBlue,
            border: Color::DarkGray,
            text: Color::White,
            dim: Color::DarkGray,
            highlight_bg: Color::Rgb(25, 40, 60),
            active: Color::LightBlue,
            idle: Color::DarkGray,
            spinner: Color::Cyan,
            footer_fg: Color::DarkGray,
            footer_bg: Color::Reset,
        }
    }

    pub fn result_color(&self, result: DtoResult) -> Color {
        match result {
            DtoResult::Success => self.success,
            DtoResult::Fail => self.warning,
        }
    }

    pub fn stage_style(&self, status: StageStatus) -> Style {
        match status {
            StageStatus::Idle => Style::default().fg(self.idle),
            StageStatus::Running => Style::default().fg(self.spinner).add_modifier(Modifier::BOLD),
            StageStatus::Ready => Style::default().fg(self.success),
        }
    }

    pub fn notification_color(&self, level: NotificationLevel) -> Color {
        match level {
            NotificationLevel::Info => self.info,
            NotificationLevel::Success => self.success,
            NotificationLevel::Warning => self.warning,
            NotificationLevel::Error => self.failure,
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default().fg(self.header_fg).bg(self.header_bg).add_modifier(Modifier::BOLD)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().bg(self.highlight_bg).add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn footer_style(&self) -> Style {
        Style::default().fg(self.footer_fg).bg(self.footer_bg)
    }
}
