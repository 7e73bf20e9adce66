//! SQLite-backed `WaveformDb`
//!
//! Read side of the scan schema. Id lists are bound as parameters in chunks
//! so arbitrarily large staged sets stay under SQLite's variable limit.

use super::filter::QueryFilter;
use super::rows::{ScanRow, WaveformDataRow, WaveformMetricRow};
use super::schema::open_database;
use super::WaveformDb;
use crate::config::DbConfig;
use crate::error::StoreError;
use crate::model::timestamp::{format_db, parse_db};
use crate::model::MetadataValue;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::{BTreeMap, HashMap};

/// Max scan ids bound into a single statement
const ID_CHUNK: usize = 500;

pub struct SqliteWaveformDb {
    conn: Connection,
}

impl SqliteWaveformDb {
    /// Wrap an existing connection (schema assumed present)
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open the configured database, creating the schema if needed
    pub fn open(config: &DbConfig) -> Result<Self, StoreError> {
        Ok(Self::new(open_database(config)?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Mutable access for writers (`Scan::insert_data` needs `&mut Connection`)
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Attach scan_fdata / scan_sdata entries to already-loaded scan rows
    fn load_scan_metadata(&self, rows: &mut [ScanRow]) -> Result<(), StoreError> {
        let index: HashMap<i64, usize> = rows.iter().enumerate().map(|(i, r)| (r.sid, i)).collect();
        let sids: Vec<i64> = rows.iter().map(|r| r.sid).collect();

        for chunk in sids.chunks(ID_CHUNK) {
            let marks = placeholders(chunk.len());

            let mut stmt = self.conn.prepare(&format!(
                "SELECT sid, name, value FROM scan_fdata WHERE sid IN ({})",
                marks
            ))?;
            let floats = stmt
                .query_map(params_from_iter(chunk.iter()), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            for (sid, name, value) in floats {
                if let Some(&i) = index.get(&sid) {
                    rows[i].metadata.insert(name, MetadataValue::Float(value));
                }
            }

            let mut stmt = self.conn.prepare(&format!(
                "SELECT sid, name, value FROM scan_sdata WHERE sid IN ({})",
                marks
            ))?;
            let texts = stmt
                .query_map(params_from_iter(chunk.iter()), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            for (sid, name, value) in texts {
                if let Some(&i) = index.get(&sid) {
                    rows[i].metadata.insert(name, MetadataValue::Text(value));
                }
            }
        }

        Ok(())
    }
}

impl WaveformDb for SqliteWaveformDb {
    fn query_scan_rows(
        &self,
        begin: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<ScanRow>, StoreError> {
        let mut sql = String::from("SELECT s.sid, s.scan_start_utc, s.scan_end_utc FROM scan s WHERE 1 = 1");
        let mut params: Vec<Value> = Vec::new();

        if let Some(begin) = begin {
            sql.push_str(" AND s.scan_start_utc >= ?");
            params.push(Value::Text(format_db(&begin)));
        }
        if let Some(end) = end {
            sql.push_str(" AND s.scan_end_utc <= ?");
            params.push(Value::Text(format_db(&end)));
        }
        if let Some((predicate, filter_params)) = filter.and_then(QueryFilter::to_sql) {
            sql.push_str(" AND ");
            sql.push_str(&predicate);
            params.extend(filter_params);
        }
        sql.push_str(" ORDER BY s.scan_start_utc, s.sid");

        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = raw
            .into_iter()
            .map(|(sid, start, end)| {
                Ok(ScanRow {
                    sid,
                    scan_start_utc: parse_db(&start)?,
                    scan_end_utc: parse_db(&end)?,
                    metadata: BTreeMap::new(),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        self.load_scan_metadata(&mut rows)?;

        log::debug!("📥 query_scan_rows: {} scans", rows.len());
        Ok(rows)
    }

    fn query_waveform_data(
        &self,
        scan_ids: &[i64],
        signal_names: &[String],
        array_names: Option<&[String]>,
    ) -> Result<Vec<WaveformDataRow>, StoreError> {
        if scan_ids.is_empty() || signal_names.is_empty() || array_names.is_some_and(|a| a.is_empty()) {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for chunk in scan_ids.chunks(ID_CHUNK) {
            let mut sql = format!(
                "SELECT w.sid, w.wid, w.cavity, w.signal_name, w.sample_rate_hz, a.name, a.data
                 FROM waveform w JOIN waveform_adata a ON a.wid = w.wid
                 WHERE w.sid IN ({}) AND w.signal_name IN ({})",
                placeholders(chunk.len()),
                placeholders(signal_names.len())
            );
            let mut params = id_and_name_params(chunk, signal_names);
            if let Some(names) = array_names {
                sql.push_str(&format!(" AND a.name IN ({})", placeholders(names.len())));
                params.extend(names.iter().cloned().map(Value::Text));
            }
            sql.push_str(" ORDER BY w.sid, w.wid, a.name");

            let mut stmt = self.conn.prepare(&sql)?;
            let raw = stmt
                .query_map(params_from_iter(params.iter()), |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            for (sid, wid, cavity, signal_name, sample_rate_hz, array_name, data) in raw {
                out.push(WaveformDataRow {
                    sid,
                    wid,
                    cavity,
                    signal_name,
                    sample_rate_hz,
                    array_name,
                    data: serde_json::from_str(&data)?,
                });
            }
        }

        log::debug!("📥 query_waveform_data: {} arrays", out.len());
        Ok(out)
    }

    fn query_waveform_metadata(
        &self,
        scan_ids: &[i64],
        signal_names: &[String],
        metric_names: Option<&[String]>,
    ) -> Result<Vec<WaveformMetricRow>, StoreError> {
        if scan_ids.is_empty() || signal_names.is_empty() || metric_names.is_some_and(|m| m.is_empty()) {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for chunk in scan_ids.chunks(ID_CHUNK) {
            let mut sql = format!(
                "SELECT w.sid, w.wid, w.cavity, w.signal_name, w.sample_rate_hz, d.name, d.value
                 FROM waveform w JOIN waveform_sdata d ON d.wid = w.wid
                 WHERE w.sid IN ({}) AND w.signal_name IN ({})",
                placeholders(chunk.len()),
                placeholders(signal_names.len())
            );
            let mut params = id_and_name_params(chunk, signal_names);
            if let Some(names) = metric_names {
                sql.push_str(&format!(" AND d.name IN ({})", placeholders(names.len())));
                params.extend(names.iter().cloned().map(Value::Text));
            }
            sql.push_str(" ORDER BY w.sid, w.wid, d.name");

            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                Ok(WaveformMetricRow {
                    sid: row.get(0)?,
                    wid: row.get(1)?,
                    cavity: row.get(2)?,
                    signal_name: row.get(3)?,
                    sample_rate_hz: row.get(4)?,
                    metric_name: row.get(5)?,
                    value: row.get(6)?,
                })
            })?;
            for row in rows {
                out.push(row?);
            }
        }

        log::debug!("📥 query_waveform_metadata: {} metrics", out.len());
        Ok(out)
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn id_and_name_params(ids: &[i64], names: &[String]) -> Vec<Value> {
    ids.iter()
        .map(|&id| Value::Integer(id))
        .chain(names.iter().cloned().map(Value::Text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::filter::{FilterClause, FilterOp};
    use crate::store::open_in_memory;
    use chrono::TimeZone;
    use rusqlite::params;

    /// Insert a scan with one waveform (GMES) carrying raw + power_spectrum and two metrics
    fn seed_scan(conn: &Connection, start: &str, end: &str, current: f64, mode: &str) -> i64 {
        conn.execute(
            "INSERT INTO scan (scan_start_utc, scan_end_utc) VALUES (?1, ?2)",
            params![start, end],
        )
        .unwrap();
        let sid = conn.last_insert_rowid();

        conn.execute(
            "INSERT INTO scan_fdata (sid, name, value) VALUES (?1, 'R1XXITOT', ?2)",
            params![sid, current],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO scan_sdata (sid, name, value) VALUES (?1, 'mode', ?2)",
            params![sid, mode],
        )
        .unwrap();

        for signal in ["GMES", "PMES"] {
            conn.execute(
                "INSERT INTO waveform (sid, cavity, signal_name, sample_rate_hz) VALUES (?1, '1L10-1', ?2, 5000.0)",
                params![sid, signal],
            )
            .unwrap();
            let wid = conn.last_insert_rowid();
            conn.execute(
                "INSERT INTO waveform_adata (wid, name, data) VALUES (?1, 'raw', '[1.0, 2.0, 3.0]')",
                params![wid],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO waveform_adata (wid, name, data) VALUES (?1, 'power_spectrum', '[0.5, 0.25]')",
                params![wid],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO waveform_sdata (wid, name, value) VALUES (?1, 'rms', 2.16), (?1, 'mean', 2.0)",
                params![wid],
            )
            .unwrap();
        }

        sid
    }

    fn seeded_db() -> (SqliteWaveformDb, Vec<i64>) {
        let conn = open_in_memory().unwrap();
        let a = seed_scan(&conn, "2024-01-01 00:00:00.000000", "2024-01-01 00:00:01.000000", 10.0, "CW");
        let b = seed_scan(&conn, "2024-01-02 00:00:00.000000", "2024-01-02 00:00:01.000000", 20.0, "GDR");
        let c = seed_scan(&conn, "2024-01-03 00:00:00.000000", "2024-01-03 00:00:01.000000", 30.0, "GDR");
        (SqliteWaveformDb::new(conn), vec![a, b, c])
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scan_rows_carry_metadata() {
        let (db, sids) = seeded_db();
        let rows = db.query_scan_rows(None, None, None).unwrap();

        assert_eq!(rows.iter().map(|r| r.sid).collect::<Vec<_>>(), sids);
        assert_eq!(rows[0].metadata["R1XXITOT"], MetadataValue::Float(10.0));
        assert_eq!(rows[1].metadata["mode"], MetadataValue::Text("GDR".to_string()));
        assert_eq!(
            rows[2].scan_start_utc,
            Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_time_window_bounds() {
        let (db, sids) = seeded_db();
        let begin = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();

        let rows = db.query_scan_rows(Some(begin), Some(end), None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sid, sids[1]);

        let rows = db.query_scan_rows(Some(begin), None, None).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_metadata_filter() {
        let (db, sids) = seeded_db();

        let filter = QueryFilter::all()
            .with(FilterClause::new("mode", FilterOp::Eq, "GDR"))
            .with(FilterClause::new("R1XXITOT", FilterOp::Gt, 25.0));
        let rows = db.query_scan_rows(None, None, Some(&filter)).unwrap();
        assert_eq!(rows.iter().map(|r| r.sid).collect::<Vec<_>>(), vec![sids[2]]);

        let filter = QueryFilter::any()
            .with(FilterClause::new("mode", FilterOp::Eq, "CW"))
            .with(FilterClause::new("R1XXITOT", FilterOp::Ge, 30.0));
        let rows = db.query_scan_rows(None, None, Some(&filter)).unwrap();
        assert_eq!(rows.iter().map(|r| r.sid).collect::<Vec<_>>(), vec![sids[0], sids[2]]);

        let filter = QueryFilter::all().with(FilterClause::new("missing", FilterOp::Eq, 1.0));
        assert!(db.query_scan_rows(None, None, Some(&filter)).unwrap().is_empty());
    }

    #[test]
    fn test_waveform_data_filters() {
        let (db, sids) = seeded_db();

        let rows = db
            .query_waveform_data(&sids[..2], &names(&["GMES"]), None)
            .unwrap();
        // 2 scans x 1 signal x (raw + power_spectrum)
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.signal_name == "GMES"));

        let raw_only = names(&["raw"]);
        let rows = db
            .query_waveform_data(&sids, &names(&["GMES", "PMES"]), Some(raw_only.as_slice()))
            .unwrap();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.array_name == "raw" && r.data == vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_waveform_metadata_filters() {
        let (db, sids) = seeded_db();

        let rows = db
            .query_waveform_metadata(&sids[2..], &names(&["PMES"]), None)
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rms = names(&["rms"]);
        let rows = db
            .query_waveform_metadata(&sids, &names(&["GMES"]), Some(rms.as_slice()))
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.metric_name == "rms" && r.value == 2.16));
    }

    #[test]
    fn test_empty_inputs_short_circuit() {
        let (db, sids) = seeded_db();
        assert!(db.query_waveform_data(&[], &names(&["GMES"]), None).unwrap().is_empty());
        assert!(db.query_waveform_data(&sids, &[], None).unwrap().is_empty());
        let no_metrics: Vec<String> = Vec::new();
        assert!(db
            .query_waveform_metadata(&sids, &names(&["GMES"]), Some(no_metrics.as_slice()))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_large_id_sets_are_chunked() {
        let (db, sids) = seeded_db();
        let mut ids: Vec<i64> = (10_000..11_200).collect();
        ids.push(sids[0]);

        let rows = db.query_waveform_data(&ids, &names(&["GMES"]), None).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
