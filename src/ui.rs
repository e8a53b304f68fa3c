use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, Dialog};
use crate::service::utils::{format_size, space_summary};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title and key help
            Constraint::Min(10),   // Folder view
            Constraint::Length(3), // Space usage
            Constraint::Length(3), // Status
        ])
        .split(frame.area());

    render_title(frame, chunks[0]);

    if let Some(dialog) = &app.dialog {
        render_dialog(frame, dialog, chunks[1]);
    } else if app.warning.is_some() {
        let warning = Paragraph::new(app.warning_message().to_string())
            .block(Block::default().title(" Warning ").borders(Borders::ALL))
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD));
        frame.render_widget(warning, chunks[1]);
    } else {
        render_folder_view(frame, app, chunks[1]);
    }

    render_space(frame, app, chunks[2]);
    render_status(frame, app, chunks[3]);
}

fn render_title(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled(" Device File Manager", Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        Span::styled("↑↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Navigate | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Open | "),
        Span::styled("d", Style::default().fg(Color::Yellow)),
        Span::raw(" Download | "),
        Span::styled("x", Style::default().fg(Color::Yellow)),
        Span::raw(" Delete | "),
        Span::styled("n", Style::default().fg(Color::Yellow)),
        Span::raw(" New folder | "),
        Span::styled("u", Style::default().fg(Color::Yellow)),
        Span::raw(" Upload | "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" Refresh | "),
        Span::styled("R", Style::default().fg(Color::Yellow)),
        Span::raw(" Reboot | "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit"),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, area);
}

fn render_folder_view(frame: &mut Frame, app: &App, area: Rect) {
    let mut items: Vec<ListItem> = Vec::with_capacity(app.entries.len() + 1);

    if !app.folder.is_root() {
        items.push(ListItem::new(Line::from(Span::styled(
            "📁 ..",
            Style::default().add_modifier(Modifier::DIM),
        ))));
    }

    for (index, entry) in app.entries.iter().enumerate() {
        let prefix = if entry.is_dir { "📁 " } else { "📄 " };
        let size = if entry.is_dir {
            String::new()
        } else {
            format_size(entry.size)
        };
        let note = if entry.is_dir && !entry.delete_enabled {
            "  [not empty]"
        } else {
            ""
        };

        let style = if Some(index) == app.selected_index {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        items.push(ListItem::new(Line::from(vec![
            Span::styled(format!("{prefix}{:<40}", entry.name), style),
            Span::styled(format!("{size:>12}"), style),
            Span::styled(note, Style::default().add_modifier(Modifier::DIM)),
        ])));
    }

    let title = format!(" {} ({}) ", app.folder.label(), app.folder);
    let folder_list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(folder_list, area);
}

fn render_dialog(frame: &mut Frame, dialog: &Dialog, area: Rect) {
    let (title, body, style) = match dialog {
        Dialog::ConfirmDeleteFile { name } => (
            " Delete file ",
            format!("Are you sure you want to delete \"{name}\"? (y/n)"),
            Style::default().fg(Color::Red),
        ),
        Dialog::ConfirmDeleteFolder { name } => (
            " Delete folder ",
            format!("Are you sure you want to delete the folder \"{name}\"? (y/n)"),
            Style::default().fg(Color::Red),
        ),
        Dialog::ConfirmReboot => (
            " Reboot ",
            "Are you sure you want to reboot the device? (y/n)".to_string(),
            Style::default().fg(Color::Red),
        ),
        Dialog::FolderNamePrompt { input } => (
            " New folder ",
            format!("Enter folder name: {input}█"),
            Style::default().fg(Color::Cyan),
        ),
        Dialog::UploadPathPrompt { input } => (
            " Upload ",
            format!("Local file path(s), ';' separated: {input}█"),
            Style::default().fg(Color::Cyan),
        ),
        Dialog::RebootNotice => (
            " Rebooting ",
            "Device is rebooting...".to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
    };

    let dialog_widget = Paragraph::new(body)
        .block(Block::default().title(title).borders(Borders::ALL))
        .style(style);
    frame.render_widget(dialog_widget, area);
}

fn render_space(frame: &mut Frame, app: &App, area: Rect) {
    let space = Paragraph::new(space_summary(app.used_space, app.total_space))
        .style(Style::default().fg(Color::White))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(space, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = match app.selected_entry() {
        Some(entry) if entry.is_dir => format!("Folder: {}", entry.name),
        Some(entry) => format!("File: {} ({})", entry.name, format_size(entry.size)),
        None => "No entry selected".to_string(),
    };

    let status_widget = Paragraph::new(status)
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, area);
}
