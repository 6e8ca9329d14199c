//! Append-only record output. One trial record per scored trial, one probe
//! record per probe pause, one summary per experiment block.

use crate::aggregate::BlockSummary;
use crate::config::SessionInfo;
use crate::error::SinkError;
use sart_core::{BlockKind, ProbeResult, TrialOutcome};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub block: BlockKind,
    /// 1-based position in the block.
    pub trial: usize,
    pub digit: u8,
    pub is_target: bool,
    pub response: Option<String>,
    /// Seconds from digit onset.
    pub rt: Option<f64>,
    pub correct: bool,
    pub digit_height: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRecord {
    pub block: BlockKind,
    pub probe_trial: usize,
    pub attention_rating: Option<String>,
    pub awareness_rating: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub block: BlockKind,
    pub trials: usize,
    pub summary_go_accuracy: f64,
    pub summary_nogo_accuracy: f64,
    /// Seconds.
    pub summary_mean_rt: f64,
    pub go_correct: u32,
    pub go_omissions: u32,
    pub nogo_correct: u32,
    pub nogo_commissions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
    Trial(TrialRecord),
    Probe(ProbeRecord),
    Summary(SummaryRecord),
}

impl Record {
    pub fn trial(block: BlockKind, outcome: &TrialOutcome, digit_height: Option<f32>) -> Self {
        Record::Trial(TrialRecord {
            block,
            trial: outcome.spec.index + 1,
            digit: outcome.spec.digit.value(),
            is_target: outcome.spec.is_target,
            response: outcome.responded.then(|| "space".to_string()),
            rt: outcome.reaction_time.map(|rt| rt.as_secs_f64()),
            correct: outcome.correct,
            digit_height,
        })
    }

    pub fn probe(block: BlockKind, probe: &ProbeResult) -> Self {
        Record::Probe(ProbeRecord {
            block,
            probe_trial: probe.trial_index,
            attention_rating: probe.attention_rating.map(|k| k.label()),
            awareness_rating: probe.awareness_rating.map(|k| k.label()),
        })
    }

    pub fn summary(summary: &BlockSummary) -> Self {
        let c = &summary.counters;
        Record::Summary(SummaryRecord {
            block: summary.kind,
            trials: summary.trials,
            summary_go_accuracy: summary.go_accuracy,
            summary_nogo_accuracy: summary.nogo_accuracy,
            summary_mean_rt: summary.mean_reaction_time.as_secs_f64(),
            go_correct: c.go_correct,
            go_omissions: c.go_omissions,
            nogo_correct: c.nogo_correct,
            nogo_commissions: c.nogo_commissions,
        })
    }
}

pub trait DataSink {
    /// Appends one record. Earlier records are never touched.
    fn add_record(&mut self, record: &Record) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: DataSink + ?Sized> DataSink for &mut S {
    fn add_record(&mut self, record: &Record) -> Result<(), SinkError> {
        (**self).add_record(record)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    session: &'a SessionInfo,
    #[serde(flatten)]
    record: &'a Record,
}

/// Writes each record as one flat JSON object per line and flushes it
/// immediately, so an abort never loses a scored trial.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    session: SessionInfo,
    written: usize,
}

impl JsonLinesSink<BufWriter<File>> {
    /// Opens `path` for appending, creating parent directories as needed.
    pub fn create(path: &Path, session: SessionInfo) -> Result<Self, SinkError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::info!(path = %path.display(), "data file opened");
        Ok(Self::new(BufWriter::new(file), session))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W, session: SessionInfo) -> Self {
        Self {
            writer,
            session,
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DataSink for JsonLinesSink<W> {
    fn add_record(&mut self, record: &Record) -> Result<(), SinkError> {
        let envelope = Envelope {
            session: &self.session,
            record,
        };
        serde_json::to_writer(&mut self.writer, &envelope)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps records in memory. Used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub records: Vec<Record>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trials(&self) -> impl Iterator<Item = &TrialRecord> {
        self.records.iter().filter_map(|r| match r {
            Record::Trial(t) => Some(t),
            _ => None,
        })
    }

    pub fn probes(&self) -> impl Iterator<Item = &ProbeRecord> {
        self.records.iter().filter_map(|r| match r {
            Record::Probe(p) => Some(p),
            _ => None,
        })
    }

    pub fn summaries(&self) -> impl Iterator<Item = &SummaryRecord> {
        self.records.iter().filter_map(|r| match r {
            Record::Summary(s) => Some(s),
            _ => None,
        })
    }
}

impl DataSink for MemorySink {
    fn add_record(&mut self, record: &Record) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use sart_core::{Digit, Key, TrialSpec};
    use serde_json::Value;
    use std::time::Duration;

    fn session() -> SessionInfo {
        SessionInfo::new(
            "a00000042".parse().unwrap(),
            "1".parse().unwrap(),
            Digit::new(3).unwrap(),
            Local.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
        )
    }

    fn outcome() -> TrialOutcome {
        TrialOutcome {
            spec: TrialSpec::new(4, Digit::new(7).unwrap(), Digit::new(3).unwrap()),
            responded: true,
            reaction_time: Some(Duration::from_millis(375)),
            correct: true,
        }
    }

    #[test]
    fn trial_line_is_flat_and_carries_session_fields() {
        let mut sink = JsonLinesSink::new(Vec::new(), session());
        sink.add_record(&Record::trial(BlockKind::Experiment, &outcome(), Some(0.3)))
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 1);

        let v: Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(v["record"], "trial");
        assert_eq!(v["participant"], "a00000042");
        assert_eq!(v["session"], 1);
        assert_eq!(v["date"], "2024-01-02");
        assert_eq!(v["target_digit"], 3);
        assert_eq!(v["block"], "experiment");
        assert_eq!(v["trial"], 5);
        assert_eq!(v["digit"], 7);
        assert_eq!(v["response"], "space");
        assert_eq!(v["correct"], true);
        assert!((v["rt"].as_f64().unwrap() - 0.375).abs() < 1e-9);
    }

    #[test]
    fn probe_ratings_use_key_labels() {
        let mut sink = JsonLinesSink::new(Vec::new(), session());
        let probe = ProbeResult {
            trial_index: 20,
            attention_rating: Some(Key::Number(4)),
            awareness_rating: None,
        };
        sink.add_record(&Record::probe(BlockKind::Experiment, &probe))
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let v: Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(v["record"], "probe");
        assert_eq!(v["probe_trial"], 20);
        assert_eq!(v["attention_rating"], "4");
        assert!(v["awareness_rating"].is_null());
    }

    #[test]
    fn file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("out.jsonl");
        {
            let mut sink = JsonLinesSink::create(&path, session()).unwrap();
            sink.add_record(&Record::trial(BlockKind::Practice, &outcome(), None))
                .unwrap();
            assert_eq!(sink.written(), 1);
        }
        {
            let mut sink = JsonLinesSink::create(&path, session()).unwrap();
            sink.add_record(&Record::trial(BlockKind::Practice, &outcome(), None))
                .unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
