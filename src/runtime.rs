use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::mpsc;
use std::time::Duration;
use tracing::warn;

use crate::app::{App, InputMode};
use crate::export;
use crate::net::{spawn_fetch, FetchOutcome, FetchRequest};
use crate::ui;

pub fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

#[derive(Debug, PartialEq)]
pub enum Action {
    None,
    Quit,
    Fetch(FetchRequest),
    ExportCsv,
    ExportJson,
}

pub fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: App,
    client: reqwest::blocking::Client,
) -> Result<()> {
    let tick_rate = Duration::from_millis(50);
    let (tx, rx) = mpsc::channel::<FetchOutcome>();
    loop {
        while let Ok(outcome) = rx.try_recv() {
            app.apply_outcome(outcome);
        }

        let indices = app.visible_indices();
        app.clamp_selection_to(indices.len());

        terminal.draw(|f| ui::ui(f, &mut app, &indices))?;
        app.advance_tick();

        if !event::poll(tick_rate)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                match handle_key(&mut app, key, indices.len()) {
                    Action::None => {}
                    Action::Quit => return Ok(()),
                    Action::Fetch(request) => {
                        spawn_fetch(client.clone(), app.api_base.clone(), request, tx.clone());
                    }
                    Action::ExportCsv => match export::export_csv(&app, &indices) {
                        Ok(path) => app.set_last_export(path),
                        Err(err) => warn!("csv export failed: {err:#}"),
                    },
                    Action::ExportJson => match export::export_json(&app, &indices) {
                        Ok(path) => app.set_last_export(path),
                        Err(err) => warn!("json export failed: {err:#}"),
                    },
                }
            }
            Event::Mouse(mouse) => handle_mouse(&mut app, indices.len(), mouse),
            _ => {}
        }
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent, visible_len: usize) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return Action::Quit,
            KeyCode::Char('u') => app.clear_field(),
            _ => {}
        }
        return Action::None;
    }

    if app.input_mode == InputMode::Help {
        if matches!(key.code, KeyCode::Esc | KeyCode::F(1)) {
            app.close_help();
        }
        return Action::None;
    }

    match key.code {
        KeyCode::Esc => return Action::Quit,
        KeyCode::Enter => {
            if let Some(request) = app.submit() {
                return Action::Fetch(request);
            }
        }
        KeyCode::Tab => app.focus_next(),
        KeyCode::BackTab => app.focus_previous(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Down => app.next_row(visible_len),
        KeyCode::Up => app.previous_row(visible_len),
        KeyCode::PageDown => app.page_down(visible_len, app.page_size()),
        KeyCode::PageUp => app.page_up(visible_len, app.page_size()),
        KeyCode::F(1) => app.open_help(),
        KeyCode::F(2) => app.toggle_sort(),
        KeyCode::F(3) => return Action::ExportCsv,
        KeyCode::F(4) => return Action::ExportJson,
        KeyCode::Char(ch) => app.push_char(ch),
        _ => {}
    }
    Action::None
}

fn handle_mouse(app: &mut App, visible_len: usize, mouse: MouseEvent) {
    if app.input_mode != InputMode::Normal {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.previous_row(visible_len),
        MouseEventKind::ScrollDown => app.next_row(visible_len),
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(row) = app.table_row_at(mouse.row) {
                app.select_row(row, visible_len);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::{handle_key, Action};
    use crate::app::{App, Field, InputMode};
    use crate::config::Config;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with_credentials() -> App {
        App::new(&Config {
            client_id: "alice".to_string(),
            client_secret: "s3cret".to_string(),
            ..Config::default()
        })
    }

    #[test]
    fn enter_issues_a_single_fetch() {
        let mut app = app_with_credentials();
        assert!(matches!(handle_key(&mut app, press(KeyCode::Enter), 0), Action::Fetch(_)));
        assert!(app.loading);
        assert_eq!(handle_key(&mut app, press(KeyCode::Enter), 0), Action::None);
    }

    #[test]
    fn invalid_bounds_issue_no_fetch() {
        let mut app = app_with_credentials();
        handle_key(&mut app, press(KeyCode::Char('x')), 0);
        assert_eq!(handle_key(&mut app, press(KeyCode::Enter), 0), Action::None);
        assert!(!app.loading);
        assert!(app.last_error.is_some());
    }

    #[test]
    fn typing_and_clearing() {
        let mut app = app_with_credentials();
        handle_key(&mut app, press(KeyCode::Tab), 0);
        assert_eq!(app.focus, Field::MaxLat);
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL), 0);
        handle_key(&mut app, press(KeyCode::Char('4')), 0);
        handle_key(&mut app, press(KeyCode::Char('2')), 0);
        assert_eq!(app.input(Field::MaxLat), "42");
        handle_key(&mut app, press(KeyCode::BackTab), 0);
        assert_eq!(app.focus, Field::MinLat);
    }

    #[test]
    fn help_swallows_keys_until_closed() {
        let mut app = app_with_credentials();
        handle_key(&mut app, press(KeyCode::F(1)), 0);
        assert_eq!(app.input_mode, InputMode::Help);
        assert_eq!(handle_key(&mut app, press(KeyCode::Enter), 0), Action::None);
        assert!(!app.loading);
        assert_eq!(handle_key(&mut app, press(KeyCode::Esc), 0), Action::None);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(handle_key(&mut app, press(KeyCode::Esc), 0), Action::Quit);
    }

    #[test]
    fn function_keys_map_to_actions() {
        let mut app = app_with_credentials();
        assert_eq!(handle_key(&mut app, press(KeyCode::F(3)), 0), Action::ExportCsv);
        assert_eq!(handle_key(&mut app, press(KeyCode::F(4)), 0), Action::ExportJson);
        assert_eq!(
            handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), 0),
            Action::Quit
        );
    }
}
