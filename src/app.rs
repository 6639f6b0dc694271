use std::cmp::Ordering;
use std::time::SystemTime;

use ratatui::layout::Rect;
use ratatui::widgets::TableState;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::model::FlightRecord;
use crate::net::{BoundingBox, Credentials, FetchError, FetchRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortMode {
    Arrival,
    Callsign,
    Altitude,
    Speed,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::Arrival => SortMode::Callsign,
            SortMode::Callsign => SortMode::Altitude,
            SortMode::Altitude => SortMode::Speed,
            SortMode::Speed => SortMode::Arrival,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::Arrival => "API",
            SortMode::Callsign => "CALLSIGN",
            SortMode::Altitude => "ALT",
            SortMode::Speed => "SPD",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    MinLat,
    MaxLat,
    MinLon,
    MaxLon,
    ClientId,
    ClientSecret,
}

pub const FIELD_COUNT: usize = 6;

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::MinLat,
        Field::MaxLat,
        Field::MinLon,
        Field::MaxLon,
        Field::ClientId,
        Field::ClientSecret,
    ];

    pub fn index(self) -> usize {
        match self {
            Field::MinLat => 0,
            Field::MaxLat => 1,
            Field::MinLon => 2,
            Field::MaxLon => 3,
            Field::ClientId => 4,
            Field::ClientSecret => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::MinLat => "Min lat",
            Field::MaxLat => "Max lat",
            Field::MinLon => "Min lon",
            Field::MaxLon => "Max lon",
            Field::ClientId => "Client ID",
            Field::ClientSecret => "Client secret",
        }
    }

    pub fn masked(self) -> bool {
        self == Field::ClientSecret
    }

    fn next(self) -> Self {
        Field::ALL[(self.index() + 1) % FIELD_COUNT]
    }

    fn previous(self) -> Self {
        Field::ALL[(self.index() + FIELD_COUNT - 1) % FIELD_COUNT]
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter valid numbers for all bounding box fields")]
    InvalidBounds,
    #[error("Please enter both client ID and client secret")]
    MissingCredentials,
}

pub struct App {
    pub(crate) api_base: String,
    pub(crate) inputs: [String; FIELD_COUNT],
    pub(crate) focus: Field,
    pub(crate) records: Vec<FlightRecord>,
    pub(crate) fetched: bool,
    pub(crate) loading: bool,
    pub(crate) last_error: Option<String>,
    pub(crate) last_update: Option<SystemTime>,
    pub(crate) sort: SortMode,
    pub(crate) table_state: TableState,
    pub(crate) table_area: Option<Rect>,
    pub(crate) table_header_rows: u16,
    pub(crate) input_mode: InputMode,
    pub(crate) last_export: Option<(String, SystemTime)>,
    pub(crate) tick: u64,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));
        Self {
            api_base: config.api_base.clone(),
            inputs: [
                config.min_lat.clone(),
                config.max_lat.clone(),
                config.min_lon.clone(),
                config.max_lon.clone(),
                config.client_id.clone(),
                config.client_secret.clone(),
            ],
            focus: Field::MinLat,
            records: Vec::new(),
            fetched: false,
            loading: false,
            last_error: None,
            last_update: None,
            sort: SortMode::Arrival,
            table_state,
            table_area: None,
            table_header_rows: 1,
            input_mode: InputMode::Normal,
            last_export: None,
            tick: 0,
        }
    }

    pub fn input(&self, field: Field) -> &str {
        &self.inputs[field.index()]
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    pub fn push_char(&mut self, ch: char) {
        self.inputs[self.focus.index()].push(ch);
    }

    pub fn backspace(&mut self) {
        self.inputs[self.focus.index()].pop();
    }

    pub fn clear_field(&mut self) {
        self.inputs[self.focus.index()].clear();
    }

    pub fn validate(&self) -> Result<FetchRequest, InputError> {
        let number = |field: Field| -> Result<f64, InputError> {
            self.input(field)
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or(InputError::InvalidBounds)
        };
        let bbox = BoundingBox {
            min_lat: number(Field::MinLat)?,
            max_lat: number(Field::MaxLat)?,
            min_lon: number(Field::MinLon)?,
            max_lon: number(Field::MaxLon)?,
        };

        let client_id = self.input(Field::ClientId).trim();
        let client_secret = self.input(Field::ClientSecret).trim();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(InputError::MissingCredentials);
        }

        Ok(FetchRequest {
            bbox,
            credentials: Credentials {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            },
        })
    }

    /// Moves Idle to Loading and hands back the request to issue. Returns
    /// `None` while a fetch is outstanding or when the inputs are invalid.
    pub fn submit(&mut self) -> Option<FetchRequest> {
        if self.loading {
            debug!("submit ignored: fetch in flight");
            return None;
        }
        match self.validate() {
            Ok(request) => {
                self.loading = true;
                self.last_error = None;
                info!("submit bbox={:?}", request.bbox);
                Some(request)
            }
            Err(err) => {
                warn!("input rejected: {err}");
                self.last_error = Some(err.to_string());
                None
            }
        }
    }

    pub fn apply_outcome(&mut self, outcome: Result<Vec<FlightRecord>, FetchError>) {
        self.loading = false;
        match outcome {
            Ok(records) => {
                debug!("apply_outcome records={}", records.len());
                self.records = records;
                self.fetched = true;
                self.last_error = None;
                self.last_update = Some(SystemTime::now());
                self.table_state.select(Some(0));
            }
            Err(err) => {
                warn!("apply_outcome: {err}");
                self.last_error = Some(err.to_string());
            }
        }
    }

    pub fn advance_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn toggle_sort(&mut self) {
        self.sort = self.sort.next();
        debug!("sort mode -> {}", self.sort.label());
    }

    pub fn open_help(&mut self) {
        self.input_mode = InputMode::Help;
    }

    pub fn close_help(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn set_last_export(&mut self, filename: String) {
        self.last_export = Some((filename, SystemTime::now()));
    }

    pub fn set_table_area(&mut self, area: Rect, header_rows: u16) {
        self.table_area = Some(area);
        self.table_header_rows = header_rows.max(1);
    }

    pub fn table_row_at(&self, y: u16) -> Option<usize> {
        let area = self.table_area?;
        if area.height < 3 {
            return None;
        }
        let data_top = (area.y + 1).saturating_add(self.table_header_rows);
        let data_bottom = area.y + area.height.saturating_sub(1);
        if y < data_top || y >= data_bottom {
            return None;
        }
        Some((y - data_top) as usize + self.table_state.offset())
    }

    pub fn select_row(&mut self, row: usize, visible_len: usize) {
        if visible_len == 0 {
            self.table_state.select(None);
            return;
        }
        self.table_state.select(Some(row.min(visible_len - 1)));
    }

    pub fn next_row(&mut self, visible_len: usize) {
        if visible_len == 0 {
            return;
        }
        let idx = self.table_state.selected().unwrap_or(0);
        let next = if idx + 1 >= visible_len { 0 } else { idx + 1 };
        self.table_state.select(Some(next));
    }

    pub fn previous_row(&mut self, visible_len: usize) {
        if visible_len == 0 {
            return;
        }
        let idx = self.table_state.selected().unwrap_or(0);
        let prev = if idx == 0 { visible_len - 1 } else { idx - 1 };
        self.table_state.select(Some(prev));
    }

    pub fn page_down(&mut self, visible_len: usize, page: usize) {
        let idx = self.table_state.selected().unwrap_or(0);
        self.select_row(idx.saturating_add(page.max(1)), visible_len);
    }

    pub fn page_up(&mut self, visible_len: usize, page: usize) {
        let idx = self.table_state.selected().unwrap_or(0);
        self.select_row(idx.saturating_sub(page.max(1)), visible_len);
    }

    pub fn page_size(&self) -> usize {
        self.table_area
            .map(|area| area.height.saturating_sub(2 + self.table_header_rows) as usize)
            .unwrap_or(10)
    }

    pub fn clamp_selection_to(&mut self, visible_len: usize) {
        if visible_len == 0 {
            self.table_state.select(None);
        } else if let Some(selected) = self.table_state.selected() {
            if selected >= visible_len {
                self.table_state.select(Some(visible_len - 1));
            }
        } else {
            self.table_state.select(Some(0));
        }
    }

    /// Row order for the current sort mode; records themselves stay in API order.
    pub fn visible_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.records.len()).collect();
        match self.sort {
            SortMode::Arrival => {}
            SortMode::Callsign => indices.sort_by(|&a, &b| {
                let a_cs = self.records[a].callsign.as_deref();
                let b_cs = self.records[b].callsign.as_deref();
                match (a_cs, b_cs) {
                    (Some(a_cs), Some(b_cs)) => a_cs.cmp(b_cs),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }),
            SortMode::Altitude => indices.sort_by(|&a, &b| {
                let a_alt = self.records[a].baro_altitude.unwrap_or(f64::MIN);
                let b_alt = self.records[b].baro_altitude.unwrap_or(f64::MIN);
                b_alt.partial_cmp(&a_alt).unwrap_or(Ordering::Equal)
            }),
            SortMode::Speed => indices.sort_by(|&a, &b| {
                let a_spd = self.records[a].velocity.unwrap_or(f64::MIN);
                let b_spd = self.records[b].velocity.unwrap_or(f64::MIN);
                b_spd.partial_cmp(&a_spd).unwrap_or(Ordering::Equal)
            }),
        }
        indices
    }

    pub fn spinner_frame(&self) -> char {
        const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
        FRAMES[(self.tick / 2) as usize % FRAMES.len()]
    }
}
