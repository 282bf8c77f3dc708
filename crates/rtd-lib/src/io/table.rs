use crate::series::{Sample, Series};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::fs::File;
use std::path::Path;

/// Read a tracer recording table.
///
/// Expected columns: `Time` plus any of the channel triples `R,G,B`,
/// `X,Y,Z`, `L*,a*,b*` (star suffixes optional) and an optional
/// `concentration` column. Column names are matched case-sensitively so
/// that blue `B` and chroma `b` stay distinct.
pub fn read_recording_csv(path: &Path) -> Result<Series> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(file);
    let headers = reader.headers().context("reading header")?.clone();

    let time_idx = locate_any(&headers, &["Time", "time"])
        .ok_or_else(|| anyhow::anyhow!("missing timestamp column (Time)"))?;
    let rgb_idx = triple_indices(&headers, [&["R"][..], &["G"][..], &["B"][..]]);
    let xyz_idx = triple_indices(&headers, [&["X"][..], &["Y"][..], &["Z"][..]]);
    let lab_idx = triple_indices(&headers, [&["L*", "L"][..], &["a*", "a"][..], &["b*", "b"][..]]);
    let conc_idx = locate_any(&headers, &["concentration", "Concentration"]);

    let mut samples = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading record {}", row + 1))?;
        let raw_time = record
            .get(time_idx)
            .ok_or_else(|| anyhow::anyhow!("record {} has no timestamp", row + 1))?;
        let time = parse_timestamp(raw_time)
            .with_context(|| format!("parsing timestamp in record {}", row + 1))?;
        let concentration = match conc_idx.and_then(|idx| record.get(idx)) {
            Some("") | None => None,
            Some(raw) => Some(
                raw.parse::<f64>()
                    .with_context(|| format!("parsing concentration in record {}", row + 1))?,
            ),
        };
        samples.push(Sample {
            time,
            rgb: read_triple(&record, rgb_idx),
            xyz: read_triple(&record, xyz_idx),
            lab: read_triple(&record, lab_idx),
            concentration,
        });
    }
    Ok(Series { samples })
}

/// Write a recording table in the acquisition schema, NaN for missing
/// channel readings.
pub fn write_recording_csv(path: &Path, series: &Series) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().from_writer(file);
    let with_concentration = series.has_concentration();
    let mut header = vec![
        "Time", "R", "G", "B", "X", "Y", "Z", "L*", "a*", "b*",
    ];
    if with_concentration {
        header.push("concentration");
    }
    writer.write_record(&header)?;
    for sample in &series.samples {
        let mut row = vec![sample.time.to_string()];
        for triple in [sample.rgb, sample.xyz, sample.lab] {
            let values = triple.unwrap_or([f64::NAN; 3]);
            row.extend(values.iter().map(|v| v.to_string()));
        }
        if with_concentration {
            row.push(
                sample
                    .concentration
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Accepts numeric seconds, RFC 3339, or `YYYY-mm-dd HH:MM:SS[.f]`
/// wall-clock stamps (converted to UNIX seconds, assumed UTC).
fn parse_timestamp(raw: &str) -> Result<f64> {
    if let Ok(seconds) = raw.parse::<f64>() {
        return Ok(seconds);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(stamp.timestamp_micros() as f64 / 1e6);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc().timestamp_micros() as f64 / 1e6);
    }
    bail!("unrecognized timestamp format: {raw}");
}

fn locate_any(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|header| names.iter().any(|name| header == *name))
}

fn triple_indices(headers: &StringRecord, names: [&[&str]; 3]) -> Option<[usize; 3]> {
    let a = locate_any(headers, names[0])?;
    let b = locate_any(headers, names[1])?;
    let c = locate_any(headers, names[2])?;
    Some([a, b, c])
}

fn read_triple(record: &StringRecord, indices: Option<[usize; 3]>) -> Option<[f64; 3]> {
    let indices = indices?;
    let mut out = [f64::NAN; 3];
    for (slot, idx) in out.iter_mut().zip(indices) {
        *slot = record
            .get(idx)
            .and_then(|raw| raw.parse::<f64>().ok())
            .unwrap_or(f64::NAN);
    }
    Some(out)
}
