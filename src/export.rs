use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::App;
use crate::model::FlightRecord;

const EXPORT_DIR: &str = "exports";

pub fn export_csv(app: &App, indices: &[usize]) -> Result<String> {
    let path = next_export_path(Path::new(EXPORT_DIR), "csv")?;
    fs::write(&path, render_csv(&visible_records(app, indices)))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.to_string_lossy().to_string())
}

pub fn export_json(app: &App, indices: &[usize]) -> Result<String> {
    let path = next_export_path(Path::new(EXPORT_DIR), "json")?;
    let payload = serde_json::to_string_pretty(&visible_records(app, indices))?;
    fs::write(&path, payload).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.to_string_lossy().to_string())
}

fn visible_records<'a>(app: &'a App, indices: &[usize]) -> Vec<&'a FlightRecord> {
    indices
        .iter()
        .filter_map(|idx| app.records.get(*idx))
        .collect()
}

fn render_csv(records: &[&FlightRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push("callsign,origin_country,latitude,longitude,baro_altitude_m,velocity_ms".to_string());
    for record in records {
        lines.push(format!(
            "{},{},{},{},{},{}",
            csv_field(record.callsign.as_deref()),
            csv_field(record.origin_country.as_deref()),
            opt_f64(record.latitude, 4),
            opt_f64(record.longitude, 4),
            opt_f64(record.baro_altitude, 1),
            opt_f64(record.velocity, 1)
        ));
    }
    lines.join("\n")
}

fn opt_f64(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{v:.precision$}"))
        .unwrap_or_default()
}

fn csv_field(value: Option<&str>) -> String {
    let text = value.unwrap_or("");
    if text.contains(',') || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn next_export_path(dir: &Path, ext: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let stem = format!("opensky-snapshot-{}", Local::now().format("%Y%m%d-%H%M%S"));
    let path = dir.join(format!("{stem}.{ext}"));
    if !path.exists() {
        return Ok(path);
    }
    let mut i = 1;
    loop {
        let candidate = dir.join(format!("{stem}-{i}.{ext}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
        i += 1;
    }
}
