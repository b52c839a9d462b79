use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::{App, FilterField};

fn field_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn input_line<'a>(label: &'a str, value: &str, focused: bool) -> Line<'a> {
    let cursor = if focused { "_" } else { "" };
    Line::from(vec![
        Span::styled(format!("{label:<10}"), field_style(focused)),
        Span::raw(format!("{value}{cursor}")),
    ])
}

pub fn render_filter_panel(app: &App, f: &mut Frame) {
    let panel = &app.filter_panel;
    let books = app.corpus.books();
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Length(5), // inputs
            Constraint::Length(1), // suggestions
            Constraint::Min(0),    // book list
            Constraint::Length(1), // count
            Constraint::Length(1), // legend
        ])
        .split(area);

    let title = Paragraph::new("Browse Available Books")
        .block(Block::default().borders(Borders::ALL).title("Filter"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let language = panel.draft.language.as_deref().unwrap_or("any");
    let inputs = Paragraph::new(vec![
        input_line("Title:", &panel.draft.title, panel.focus == FilterField::Title),
        input_line("Author:", &panel.draft.author, panel.focus == FilterField::Author),
        Line::from(vec![
            Span::styled(
                format!("{:<10}", "Language:"),
                field_style(panel.focus == FilterField::Language),
            ),
            Span::raw(format!("< {language} >")),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(inputs, chunks[1]);

    let suggestions = panel.suggestions(books);
    if !suggestions.is_empty() {
        let mut spans = vec![Span::styled(
            "suggestions: ",
            Style::default().add_modifier(Modifier::DIM),
        )];
        for (idx, value) in suggestions.iter().enumerate() {
            if idx > 0 {
                spans.push(Span::raw(" | "));
            }
            let style = if panel.suggestion == Some(idx) {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default().add_modifier(Modifier::ITALIC)
            };
            spans.push(Span::styled(value.clone(), style));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), chunks[2]);
    }

    let matches = panel.matches(books);
    let visible = panel.page.visible(&matches);
    let list_focused = panel.focus == FilterField::Books;
    let rows: Vec<Line> = visible
        .iter()
        .enumerate()
        .map(|(idx, book)| {
            let style = if list_focused && idx == panel.selected {
                Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(
                format!(
                    "{} by {} ({}, {})",
                    book.title,
                    book.author,
                    book.language,
                    book.release_year()
                ),
                style,
            ))
        })
        .collect();
    let list = Paragraph::new(rows).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Books")
            .border_style(field_style(list_focused)),
    );
    f.render_widget(list, chunks[3]);

    let mut count = format!("showing {} of {} books", visible.len(), matches.len());
    if panel.page.has_more(matches.len()) {
        count.push_str("   (ctrl+l) load more");
    }
    f.render_widget(
        Paragraph::new(Span::styled(count, Style::default().add_modifier(Modifier::DIM))),
        chunks[4],
    );

    let legend = Paragraph::new(Span::styled(
        "(tab) next field / (↑/↓) move / (enter) pick / (ctrl+a) apply / (esc) cancel",
        Style::default().add_modifier(Modifier::ITALIC),
    ));
    f.render_widget(legend, chunks[5]);
}
