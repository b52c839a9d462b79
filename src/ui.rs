pub mod charting;
pub mod filter_panel;
pub mod screen;

use echotype::{
    metrics::consistency,
    session::{CharState, SessionResult, TypedCharacter},
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;
use webbrowser::Browser;

use crate::{
    ui::charting::{chart_points, compute_chart_params, format_label, format_minutes},
    App, AppState,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub const EMPTY_STATE_MESSAGE: &str = "No quotes available for the selected mode.";

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match (&self.state, &self.last_result) {
            (AppState::Results, Some(result)) => render_results(self, result, area, buf),
            _ => render_typing(self, area, buf),
        }
    }
}

fn bold_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold_style() -> Style {
    Style::default()
        .patch(bold_style())
        .add_modifier(Modifier::DIM)
}

fn character_span(c: &TypedCharacter) -> Span<'static> {
    let green_bold_style = Style::default().patch(bold_style()).fg(Color::Green);
    let red_bold_style = Style::default().patch(bold_style()).fg(Color::Red);
    let underlined_dim_bold_style = Style::default()
        .patch(dim_bold_style())
        .add_modifier(Modifier::UNDERLINED);

    match c.state {
        CharState::Correct => Span::styled(c.grapheme.clone(), green_bold_style),
        CharState::Incorrect => Span::styled(
            match c.grapheme.as_str() {
                " " => "·".to_owned(),
                other => other.to_owned(),
            },
            red_bold_style,
        ),
        // keep the caret visible when it sits on a space
        CharState::Current => Span::styled(c.display().to_string(), underlined_dim_bold_style),
        CharState::Pending => Span::styled(c.grapheme.clone(), dim_bold_style()),
    }
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let quote_width = session.quote().width();
    let prompt_occupied_lines = if session.is_empty() || quote_width <= max_chars_per_line as usize
    {
        1
    } else {
        ((quote_width as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(1), // mode
            Constraint::Length(1), // book
            Constraint::Min(0),
            Constraint::Length(prompt_occupied_lines),
            Constraint::Length(1), // padding
            Constraint::Length(1), // live metrics
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let mut header = vec![
        Span::styled("mode ", dim_bold_style()),
        Span::styled(
            format!("< {} >", app.mode),
            Style::default().patch(bold_style()).fg(Color::Yellow),
        ),
    ];
    if let Some(best) = app.best_speed {
        header.push(Span::styled(format!("   best {best} wpm"), dim_bold_style()));
    }
    Paragraph::new(Line::from(header))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let source = match (&app.current_book, &app.custom_quote) {
        (Some(book), _) => format!("{} by {} ({})", book.title, book.author, book.release_year()),
        (None, Some(_)) => "custom text".to_string(),
        (None, None) => String::new(),
    };
    Paragraph::new(Span::styled(source, italic_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    if session.is_empty() {
        Paragraph::new(Span::styled(
            EMPTY_STATE_MESSAGE,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);
    } else {
        let spans = session
            .characters()
            .iter()
            .map(character_span)
            .collect::<Vec<Span>>();

        Paragraph::new(Line::from(spans))
            .alignment(if prompt_occupied_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: false })
            .render(chunks[3], buf);

        let live = session.live_metrics();
        let metrics = if session.has_started() {
            format!(
                "{} wpm   {}% acc   {} errors   {:.1}s",
                live.speed,
                live.accuracy,
                live.error_count,
                session.elapsed(app.now).as_secs_f64()
            )
        } else {
            "start typing to begin".to_string()
        };
        Paragraph::new(Span::styled(metrics, dim_bold_style()))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }

    Paragraph::new(Span::styled(
        "(tab) next book / (←/→) mode / (ctrl+f) filter / (ctrl+r) retake / (esc)ape",
        italic_style,
    ))
    .render(chunks[7], buf);
}

fn metric_chart<'a>(
    points: &'a [(f64, f64)],
    title: &'a str,
    style: Style,
    y_max: Option<f64>,
) -> Chart<'a> {
    let (overall_duration, highest) = compute_chart_params(points);
    let y_max = y_max.unwrap_or(highest).max(1.0);

    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(style)
        .graph_type(GraphType::Line)
        .data(points)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, overall_duration])
                .labels(vec![
                    Span::styled("0", bold_style()),
                    Span::styled(format_label(overall_duration), bold_style()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(title)
                .bounds([0.0, y_max])
                .labels(vec![
                    Span::styled("0", bold_style()),
                    Span::styled(format_label(y_max), bold_style()),
                ]),
        )
}

fn render_results(app: &App, result: &SessionResult, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // charts
            Constraint::Length(1), // stats
            Constraint::Length(1), // book and personal best
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    let speed_points = chart_points(&result.samples, |s| s.speed);
    metric_chart(
        &speed_points,
        "wpm",
        Style::default().fg(Color::Magenta),
        None,
    )
    .render(charts[0], buf);

    let accuracy_points = chart_points(&result.samples, |s| s.accuracy);
    metric_chart(
        &accuracy_points,
        "acc %",
        Style::default().fg(Color::Cyan),
        Some(100.0),
    )
    .render(charts[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {} chars   {}   {} errors   {:.2} sd",
            result.speed,
            result.accuracy,
            result.characters_typed,
            format_minutes(result.elapsed_seconds),
            result.error_count,
            consistency(&result.samples)
        ),
        bold_style(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let mut detail = match &app.current_book {
        Some(book) => format!("{} by {}", book.title, book.author),
        None => "custom text".to_string(),
    };
    if let Some(best) = app.best_speed {
        detail.push_str(&format!("   personal best ({}): {best} wpm", app.mode));
    }
    Paragraph::new(Span::styled(
        detail,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let legend = if Browser::is_available() && app.current_book.is_some() {
        "(r)etake / (n)ext book / (f)ilter / (o)pen source / (esc)ape"
    } else {
        "(r)etake / (n)ext book / (f)ilter / (esc)ape"
    };
    Paragraph::new(Span::styled(
        legend,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[4], buf);
}
