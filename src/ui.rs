use chrono::{DateTime, Local};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Frame;
use std::time::{Duration, SystemTime};

use crate::app::{App, Field, InputMode};
use crate::model::FlightRecord;
use crate::net::STATES_PATH;

const PLACEHOLDER: &str = "-";

struct Theme {
    accent: Color,
    danger: Color,
    dim: Color,
    text: Color,
    highlight_fg: Color,
    highlight_bg: Color,
    row_even_bg: Color,
    row_odd_bg: Color,
    header_bg: Color,
    panel_bg: Color,
}

pub fn ui(f: &mut Frame, app: &mut App, indices: &[usize]) {
    let size = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(6),
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(size);

    render_header(f, chunks[0], app);
    render_form(f, chunks[1], app);
    render_status(f, chunks[2], app);
    render_table(f, chunks[3], app, indices);
    render_footer(f, chunks[4], app);

    if app.input_mode == InputMode::Help {
        render_help_menu(f, size);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme();
    let update_time = app
        .last_update
        .map(format_system_time)
        .unwrap_or_else(|| "--".to_string());
    let line = Line::from(vec![
        Span::styled(
            " OPENSKY ",
            Style::default()
                .fg(theme.highlight_fg)
                .bg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            format!("{}{}", short_source(&app.api_base), STATES_PATH),
            Style::default().fg(theme.dim),
        ),
        Span::raw("  "),
        Span::styled(
            format!("FLIGHTS {}", app.records.len()),
            Style::default().fg(theme.accent),
        ),
        Span::raw("  "),
        Span::styled(
            format!("UPDATED {update_time}"),
            Style::default().fg(theme.text),
        ),
        Span::raw("  "),
        Span::styled(
            format!("SORT {}", app.sort.label()),
            Style::default().fg(theme.text),
        ),
    ]);
    f.render_widget(
        Paragraph::new(line).style(Style::default().bg(theme.panel_bg)),
        area,
    );
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("QUERY")
        .style(Style::default().bg(theme.panel_bg));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(45),
            Constraint::Percentage(15),
        ])
        .split(inner);

    let bounds = [Field::MinLat, Field::MaxLat, Field::MinLon, Field::MaxLon];
    let creds = [Field::ClientId, Field::ClientSecret];
    let bound_lines: Vec<Line> = bounds.iter().map(|field| field_line(app, *field, &theme)).collect();
    let cred_lines: Vec<Line> = creds.iter().map(|field| field_line(app, *field, &theme)).collect();
    f.render_widget(Paragraph::new(bound_lines), columns[0]);
    f.render_widget(Paragraph::new(cred_lines), columns[1]);

    let trigger = if app.loading {
        Span::styled("[ Fetch ]", Style::default().fg(theme.dim))
    } else {
        Span::styled(
            "[ Fetch ]",
            Style::default()
                .fg(theme.highlight_fg)
                .bg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )
    };
    let hint = Span::styled("Enter", Style::default().fg(theme.dim));
    f.render_widget(
        Paragraph::new(vec![Line::from(trigger), Line::from(hint)]),
        columns[2],
    );
}

fn field_line(app: &App, field: Field, theme: &Theme) -> Line<'static> {
    let focused = app.focus == field;
    let value = display_value(app.input(field), field.masked());
    let label = format!("{:<14}", field.label());
    let value_style = if focused {
        Style::default()
            .fg(theme.highlight_fg)
            .bg(theme.highlight_bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };
    let cursor = if focused { "_" } else { " " };
    Line::from(vec![
        Span::styled(label, Style::default().fg(theme.dim)),
        Span::styled(format!("{value}{cursor}"), value_style),
    ])
}

fn display_value(raw: &str, masked: bool) -> String {
    if masked {
        "*".repeat(raw.chars().count())
    } else {
        raw.to_string()
    }
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme();
    let line = if app.loading {
        Line::from(Span::styled(
            format!(" {} Fetching flight states...", app.spinner_frame()),
            Style::default().fg(theme.accent),
        ))
    } else if let Some(err) = &app.last_error {
        Line::from(Span::styled(
            format!(" {err}"),
            Style::default().fg(theme.danger).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from("")
    };
    f.render_widget(
        Paragraph::new(line).style(Style::default().bg(theme.panel_bg)),
        area,
    );
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App, indices: &[usize]) {
    let theme = theme();
    app.set_table_area(area, 1);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .title("FLIGHTS")
        .style(Style::default().bg(theme.panel_bg));

    if indices.is_empty() {
        let message = if app.fetched {
            "No flights"
        } else {
            "Enter a bounding box and credentials, then press Enter"
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(theme.dim),
        )))
        .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let header_cells = COLUMNS.iter().map(|(label, _)| {
        Cell::from(*label).style(
            Style::default()
                .fg(theme.accent)
                .bg(theme.header_bg)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(theme.header_bg))
        .height(1);

    let rows = indices.iter().enumerate().map(|(i, idx)| {
        let style = if i % 2 == 0 {
            Style::default().bg(theme.row_even_bg).fg(theme.text)
        } else {
            Style::default().bg(theme.row_odd_bg).fg(theme.text)
        };
        Row::new(record_cells(&app.records[*idx]).map(Cell::from)).style(style)
    });

    let constraints: Vec<Constraint> = COLUMNS
        .iter()
        .map(|(_, width)| Constraint::Length(*width))
        .collect();

    let table = Table::new(rows, constraints)
        .header(header)
        .block(block)
        .column_spacing(1)
        .style(Style::default().bg(theme.panel_bg))
        .row_highlight_style(
            Style::default()
                .fg(theme.highlight_fg)
                .bg(theme.highlight_bg)
                .add_modifier(Modifier::BOLD),
        );

    f.render_stateful_widget(table, area, &mut app.table_state);
}

const COLUMNS: [(&str, u16); 6] = [
    ("Callsign", 10),
    ("Country", 22),
    ("Lat", 9),
    ("Lon", 10),
    ("Alt (m)", 8),
    ("Speed (m/s)", 11),
];

fn record_cells(record: &FlightRecord) -> [String; 6] {
    [
        fmt_text(record.callsign.as_deref()),
        fmt_text(record.origin_country.as_deref()),
        fmt_f64(record.latitude, 3),
        fmt_f64(record.longitude, 3),
        fmt_f64(record.baro_altitude, 0),
        fmt_f64(record.velocity, 1),
    ]
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme();
    let help = "Tab field  Enter fetch  ↑/↓ rows  F2 sort  F3 csv  F4 json  F1 help  Esc quit";
    let mut spans = vec![Span::styled(help, Style::default().fg(theme.dim))];
    if let Some((name, when)) = &app.last_export {
        if let Ok(delta) = SystemTime::now().duration_since(*when) {
            if delta <= Duration::from_secs(6) {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    format!("SAVED {name}"),
                    Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
                ));
            }
        }
    }
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_help_menu(f: &mut Frame, area: Rect) {
    let theme = theme();
    let popup = centered_rect(60, 16, area);

    f.render_widget(Clear, popup);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default().fg(theme.dim).add_modifier(Modifier::BOLD),
        ))
    };
    let lines = vec![
        section("Query"),
        Line::from("  Tab/S-Tab  Next / previous field"),
        Line::from("  Ctrl+U     Clear field"),
        Line::from("  Enter      Fetch flight states"),
        Line::from(""),
        section("Results"),
        Line::from("  ↑/↓ PgUp/PgDn  Move selection"),
        Line::from("  F2         Sort (API/CALLSIGN/ALT/SPD)"),
        Line::from("  F3 / F4    Export CSV / JSON"),
        Line::from(""),
        section("Quit"),
        Line::from("  Esc        Quit (closes this help first)"),
        Line::from("  Ctrl+C     Quit"),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("HELP");
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, popup);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height.saturating_sub(2)).max(3);
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(height),
            Constraint::Min(1),
        ])
        .split(area);
    let vertical = popup_layout[1];
    let width = (vertical.width * percent_x / 100).max(20);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(width),
            Constraint::Min(1),
        ])
        .split(vertical);
    horizontal[1]
}

pub(crate) fn fmt_f64(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => PLACEHOLDER.to_string(),
    }
}

pub(crate) fn fmt_text(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

fn format_system_time(time: SystemTime) -> String {
    let dt: DateTime<Local> = time.into();
    dt.format("%H:%M:%S").to_string()
}

fn short_source(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed
        .split_once("://")
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

fn theme() -> Theme {
    Theme {
        accent: Color::Yellow,
        danger: Color::Red,
        dim: Color::DarkGray,
        text: Color::Gray,
        highlight_fg: Color::Black,
        highlight_bg: Color::Rgb(200, 200, 200),
        row_even_bg: Color::Rgb(20, 20, 24),
        row_odd_bg: Color::Rgb(12, 12, 16),
        header_bg: Color::Rgb(24, 24, 28),
        panel_bg: Color::Rgb(18, 18, 22),
    }
}

#[cfg(test)]
mod tests {
    use super::{display_value, fmt_f64, fmt_text, record_cells, short_source, ui};
    use crate::app::App;
    use crate::config::Config;
    use crate::model::FlightRecord;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen_text(app: &mut App) -> String {
        let backend = TestBackend::new(100, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        let indices = app.visible_indices();
        terminal.draw(|f| ui(f, app, &indices)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn numeric_precision_per_column() {
        let record = FlightRecord {
            callsign: Some("ABC123".to_string()),
            origin_country: Some("United States".to_string()),
            longitude: Some(-73.5),
            latitude: Some(40.71234),
            baro_altitude: Some(1000.4),
            velocity: None,
        };
        assert_eq!(
            record_cells(&record),
            [
                "ABC123".to_string(),
                "United States".to_string(),
                "40.712".to_string(),
                "-73.500".to_string(),
                "1000".to_string(),
                "-".to_string(),
            ]
        );
    }

    #[test]
    fn text_helpers() {
        assert_eq!(fmt_text(None), "-");
        assert_eq!(fmt_text(Some("   ")), "-");
        assert_eq!(fmt_text(Some("US")), "US");
        assert_eq!(fmt_f64(Some(249.96), 1), "250.0");
        assert_eq!(fmt_f64(None, 3), "-");
        assert_eq!(display_value("abc", true), "***");
        assert_eq!(display_value("abc", false), "abc");
        assert_eq!(short_source("https://opensky-network.org/"), "opensky-network.org");
    }

    #[test]
    fn empty_result_shows_no_flights() {
        let mut app = App::new(&Config::default());
        assert!(!screen_text(&mut app).contains("No flights"));
        app.submit();
        app.apply_outcome(Ok(Vec::new()));
        assert!(screen_text(&mut app).contains("No flights"));
    }

    #[test]
    fn secret_is_masked_on_screen() {
        let config = Config {
            client_id: "alice".to_string(),
            client_secret: "hunter2".to_string(),
            ..Config::default()
        };
        let mut app = App::new(&config);
        let text = screen_text(&mut app);
        assert!(text.contains("alice"));
        assert!(!text.contains("hunter2"));
        assert!(text.contains("*******"));
    }

    #[test]
    fn rows_and_errors_render() {
        let mut app = App::new(&Config::default());
        app.apply_outcome(Ok(vec![FlightRecord {
            callsign: Some("SWR8".to_string()),
            origin_country: Some("Switzerland".to_string()),
            ..FlightRecord::default()
        }]));
        app.submit();
        let text = screen_text(&mut app);
        assert!(text.contains("SWR8"));
        assert!(text.contains("Switzerland"));
        assert!(text.contains("Callsign"));
        assert!(text.contains("Please enter both client ID and client secret"));
    }
}
