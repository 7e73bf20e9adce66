//! End-to-end: ingest scans into a file-backed database, then stage and run queries
//!
//! Covers:
//! - raw arrays come back unchanged after a round trip
//! - time window and metadata filters narrow the staged set
//! - a failed insert leaves nothing behind and later scans still commit
//! - JSON documents ingest the same way as programmatic scans
//! - out-of-range metadata and waveforms are refused before any write

use chrono::{DateTime, Duration, TimeZone, Utc};
use rfscope::analysis::{frequency_range, WAVEFORM_LEN};
use rfscope::query::get_frequency_range;
use rfscope::store::{FilterClause, FilterOp};
use rfscope::{
    DbConfig, Query, QueryError, QueryFilter, Scan, ScanDocument, SqliteWaveformDb, ValidationError,
};
use tempfile::TempDir;

fn open_db(dir: &TempDir) -> SqliteWaveformDb {
    let path = dir.path().join("nested").join("scans.db");
    let config = DbConfig {
        db_path: path.to_string_lossy().into_owned(),
        ..DbConfig::default()
    };
    SqliteWaveformDb::open(&config).unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
}

fn build_scan(offset_secs: i64, gradient: f64, mode: &str) -> Scan {
    let start = t0() + Duration::seconds(offset_secs);
    let mut scan = Scan::new(start, start + Duration::seconds(2));

    let gmes: Vec<f64> = (0..WAVEFORM_LEN)
        .map(|i| gradient + 0.25 * ((i % 16) as f64 - 8.0))
        .collect();
    let pmes: Vec<f64> = (0..WAVEFORM_LEN).map(|i| (i as f64 * 0.003).sin()).collect();

    scan.add_cavity_data("1L22-1", [("GMES", gmes), ("PMES", pmes)], 5000.0)
        .unwrap();
    scan.add_scan_data([("gradient", gradient)], [("mode", mode)])
        .unwrap();
    scan
}

#[test]
fn test_round_trip_returns_raw_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut db = open_db(&dir);

    let mut scan = build_scan(0, 12.0, "CW");
    let sid = scan.insert_data(db.connection_mut()).unwrap();

    let mut query = Query::new(&db, ["GMES"]).unwrap().array_names(["raw"]);
    assert_eq!(query.stage().unwrap(), 1);
    query.run().unwrap();

    let rows = query.wf_data().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sid, sid);
    assert_eq!(rows[0].array_name, "raw");
    assert_eq!(rows[0].data.as_slice(), scan.waveform_data()["1L22-1"]["GMES"]);
}

#[test]
fn test_power_spectrum_matches_frequency_axis() {
    let dir = TempDir::new().unwrap();
    let mut db = open_db(&dir);
    build_scan(0, 8.0, "CW").insert_data(db.connection_mut()).unwrap();

    let mut query = Query::new(&db, ["PMES"])
        .unwrap()
        .array_names(["power_spectrum"])
        .wf_metric_names(["dominant_frequency"]);
    query.stage().unwrap();
    query.run().unwrap();

    let spectrum = &query.wf_data().unwrap()[0];
    let axis = get_frequency_range(spectrum.sample_rate_hz, WAVEFORM_LEN).unwrap();
    assert_eq!(spectrum.data.len(), axis.len());
    assert_eq!(axis, frequency_range(5000.0, WAVEFORM_LEN));

    let metrics = query.wf_meta().unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].metric_name, "dominant_frequency");
    assert!(axis.contains(&metrics[0].value));
}

#[test]
fn test_window_and_filter_narrow_stage() {
    let dir = TempDir::new().unwrap();
    let mut db = open_db(&dir);
    for (i, (gradient, mode)) in [(5.0, "CW"), (10.0, "CW"), (15.0, "pulsed")].iter().enumerate() {
        build_scan(60 * i as i64, *gradient, mode)
            .insert_data(db.connection_mut())
            .unwrap();
    }

    let mut all = Query::new(&db, ["GMES"]).unwrap();
    assert_eq!(all.stage().unwrap(), 3);

    let mut windowed = Query::new(&db, ["GMES"])
        .unwrap()
        .begin(t0() + Duration::seconds(30))
        .end(t0() + Duration::seconds(200));
    assert_eq!(windowed.stage().unwrap(), 2);

    let filter = QueryFilter::all()
        .with(FilterClause::new("mode", FilterOp::Eq, "CW"))
        .with(FilterClause::new("gradient", FilterOp::Gt, 7.5));
    let mut filtered = Query::new(&db, ["GMES"]).unwrap().scan_filter(filter);
    assert_eq!(filtered.stage().unwrap(), 1);

    let table = filtered.scan_meta_table().unwrap();
    assert_eq!(table.column("mode").unwrap(), vec![&serde_json::json!("CW")]);
    assert_eq!(table.column("gradient").unwrap(), vec![&serde_json::json!(10.0)]);

    filtered.run().unwrap();
    let data = filtered.wf_data_table().unwrap();
    // raw + power_spectrum for the single matching GMES waveform
    assert_eq!(data.len(), 2);
}

#[test]
fn test_failed_insert_leaves_no_trace() {
    let dir = TempDir::new().unwrap();
    let mut db = open_db(&dir);

    db.connection()
        .execute_batch(
            "CREATE TRIGGER reject_pulsed BEFORE INSERT ON scan_sdata
             WHEN NEW.value = 'pulsed'
             BEGIN SELECT RAISE(ABORT, 'pulsed scans rejected'); END;",
        )
        .unwrap();

    let mut bad = build_scan(0, 3.0, "pulsed");
    assert!(bad.insert_data(db.connection_mut()).is_err());
    assert_eq!(bad.id(), None);

    let mut good = build_scan(60, 4.0, "CW");
    good.insert_data(db.connection_mut()).unwrap();

    let mut query = Query::new(&db, ["GMES", "PMES"]).unwrap();
    assert_eq!(query.stage().unwrap(), 1);
    query.run().unwrap();

    let sids: Vec<i64> = query.wf_meta().unwrap().iter().map(|r| r.sid).collect();
    assert!(sids.iter().all(|&sid| Some(sid) == good.id()));
    // 2 waveforms x 10 metrics
    assert_eq!(sids.len(), 20);

    let orphan_waveforms: i64 = db
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM waveform WHERE sid NOT IN (SELECT sid FROM scan)",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(orphan_waveforms, 0);
}

#[test]
fn test_run_requires_stage() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    let mut query = Query::new(&db, ["GMES"]).unwrap();
    assert!(matches!(query.run(), Err(QueryError::NotStaged)));
    assert!(matches!(query.scan_meta_table(), Err(QueryError::NotStaged)));
}

#[test]
fn test_json_document_ingest() {
    let dir = TempDir::new().unwrap();
    let mut db = open_db(&dir);

    let samples: Vec<f64> = (0..WAVEFORM_LEN).map(|i| (i % 4) as f64).collect();
    let doc = serde_json::json!({
        "start": "2024-02-01T07:00:00-05:00",
        "end": "2024-02-01T07:00:02-05:00",
        "cavities": {
            "2L04-3": { "sampling_rate": 2500.0, "signals": { "DF": samples.clone() } }
        },
        "metadata": { "operator": "night shift" }
    });
    let path = dir.path().join("scan.json");
    std::fs::write(&path, doc.to_string()).unwrap();

    let mut scan = ScanDocument::from_path(&path).unwrap().into_scan().unwrap();
    scan.insert_data(db.connection_mut()).unwrap();

    let mut query = Query::new(&db, ["DF"])
        .unwrap()
        .begin(t0() - Duration::hours(1))
        .end(t0() + Duration::hours(1));
    assert_eq!(query.stage().unwrap(), 1);
    assert_eq!(query.scan_meta().unwrap()[0].scan_start_utc, t0());

    query.run().unwrap();
    let raw = query
        .wf_data()
        .unwrap()
        .iter()
        .find(|r| r.array_name == "raw")
        .unwrap();
    assert_eq!(raw.cavity, "2L04-3");
    assert_eq!(raw.sample_rate_hz, 2500.0);
    assert_eq!(raw.data, samples);
}

#[test]
fn test_bad_inputs_rejected_before_store() {
    let dir = TempDir::new().unwrap();
    let mut db = open_db(&dir);

    let mut scan = build_scan(0, 6.0, "CW");
    assert!(matches!(
        scan.add_scan_data([("R1XXITOT", f64::NAN)], [("R1XXMODE", "CW")]),
        Err(ValidationError::NonFiniteMetadata { .. })
    ));
    assert!(matches!(
        scan.add_metadata("sid", 999.0),
        Err(ValidationError::ReservedMetadataName(_))
    ));

    let overflow: Vec<f64> = (0..WAVEFORM_LEN)
        .map(|i| if i % 2 == 0 { 1e160 } else { -1e160 })
        .collect();
    assert!(matches!(
        scan.add_cavity_data("1L22-2", [("GMES", overflow)], 5000.0),
        Err(ValidationError::NonFiniteAnalysis(_))
    ));

    let sid = scan.insert_data(db.connection_mut()).unwrap();

    let mut query = Query::new(&db, ["GMES"]).unwrap();
    query.stage().unwrap();
    let table = query.scan_meta_table().unwrap();
    assert_eq!(table.column("sid").unwrap(), vec![&serde_json::json!(sid)]);
    query.run().unwrap();
    assert!(query.wf_data().unwrap().iter().all(|r| r.cavity == "1L22-1"));
}
