use crate::normalize::{NormalizedCurve, ResponseKind};
use crate::properties::CurveProperties;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::File;
use std::path::Path;

/// Write one normalized curve as a table. The value column is named `rtd`
/// for impulse curves and `value` for step curves.
pub fn write_curve_csv(path: &Path, curve: &NormalizedCurve) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().from_writer(file);
    let value_column = match curve.kind {
        ResponseKind::Rtd => "rtd",
        ResponseKind::StepUp | ResponseKind::StepDown => "value",
    };
    writer.write_record([
        "time",
        "time_response",
        value_column,
        "R",
        "G",
        "B",
        "X",
        "Y",
        "Z",
        "L",
        "a",
        "b",
    ])?;
    for point in &curve.points {
        let mut row = vec![
            point.time.to_string(),
            point.response_time.to_string(),
            point.value.to_string(),
        ];
        for triple in [point.rgb, point.xyz, point.lab] {
            row.extend(triple.iter().map(|v| v.to_string()));
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the aggregated properties table, one row per analyzed event. The
/// area cell is empty for step events.
pub fn write_properties_csv(path: &Path, records: &[CurveProperties]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().from_writer(file);
    writer.write_record([
        "time",
        "file_name",
        "area",
        "mean",
        "variance",
        "std",
        "p1",
        "p5",
        "p50",
        "p95",
        "p99",
    ])?;
    for record in records {
        writer.write_record(&[
            record.time.to_string(),
            record.file_name.clone(),
            record.area.map(|a| a.to_string()).unwrap_or_default(),
            record.mean.to_string(),
            record.variance.to_string(),
            record.std.to_string(),
            record.p1.to_string(),
            record.p5.to_string(),
            record.p50.to_string(),
            record.p95.to_string(),
            record.p99.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::CurvePoint;
    use csv::ReaderBuilder;
    use tempfile::tempdir;

    fn small_curve(kind: ResponseKind) -> NormalizedCurve {
        NormalizedCurve {
            kind,
            event_time: 10.0,
            points: vec![CurvePoint {
                time: 10.0,
                response_time: 0.0,
                value: 0.5,
                rgb: [1.0, 2.0, 3.0],
                xyz: [f64::NAN; 3],
                lab: [50.0, 4.0, 12.0],
            }],
        }
    }

    #[test]
    fn curve_header_names_the_value_column_by_kind() {
        let dir = tempdir().unwrap();
        let rtd_path = dir.path().join("rtd.csv");
        let step_path = dir.path().join("step.csv");
        write_curve_csv(&rtd_path, &small_curve(ResponseKind::Rtd)).unwrap();
        write_curve_csv(&step_path, &small_curve(ResponseKind::StepUp)).unwrap();

        let rtd_header = first_line(&rtd_path);
        assert!(rtd_header.starts_with("time,time_response,rtd,R,G,B"));
        let step_header = first_line(&step_path);
        assert!(step_header.starts_with("time,time_response,value"));
    }

    #[test]
    fn properties_table_leaves_area_empty_for_steps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("properties.csv");
        let records = vec![
            CurveProperties {
                time: 10.0,
                file_name: "impulse-1_curve.csv".into(),
                area: Some(10.0),
                mean: 14.5,
                variance: 8.25,
                std: 8.25f64.sqrt(),
                p1: 0.0,
                p5: 0.0,
                p50: 14.0,
                p95: 18.0,
                p99: 19.0,
            },
            CurveProperties {
                time: 200.0,
                file_name: "step-1_curve.csv".into(),
                area: None,
                mean: 1.23,
                variance: 0.5,
                std: 0.5f64.sqrt(),
                p1: 1.0,
                p5: 1.0,
                p50: 2.0,
                p95: 3.0,
                p99: 4.0,
            },
        ];
        write_properties_csv(&path, &records).unwrap();

        let mut reader = ReaderBuilder::new().from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "file_name"));
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(2), Some("10"));
        assert_eq!(rows[1].get(2), Some(""));
        assert_eq!(rows[1].get(1), Some("step-1_curve.csv"));
    }

    fn first_line(path: &Path) -> String {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .next()
            .unwrap()
            .to_string()
    }
}
