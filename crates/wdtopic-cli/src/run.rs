//! The batch pipeline: read JSONL records, fetch claims in batches,
//! score, and write every accepted record back out with its result.
//!
//! A record's failure (bad QID, missing item, upstream error) is recorded
//! on that record alone; siblings in the same batch are unaffected and
//! the run always continues.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use wdtopic_core::{
    EncoderConfig, Qid, ThresholdMode, TopicScorer, encode, rank_all, select_topics,
    validate_threshold,
};
use wdtopic_wikidata::{ClaimSource, FetchError, MAX_IDS_PER_REQUEST};

/// Field carrying the item id in each input record.
const QID_FIELD: &str = "QID";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub threshold: f32,
    pub threshold_mode: ThresholdMode,
    /// Records per `wbgetentities` call, capped at the API limit.
    pub batch_size: usize,
    pub debug: bool,
    pub encoder: EncoderConfig,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records written to the output file.
    pub written: usize,
    /// Input lines dropped (not JSON objects, or no QID field).
    pub skipped: usize,
    /// Written records that carry an error marker instead of topics.
    pub failed: usize,
}

struct Record {
    fields: Map<String, Value>,
    qid: Result<Qid, String>,
}

pub async fn run(
    input: &Path,
    output: &Path,
    options: &RunOptions,
    claims: &dyn ClaimSource,
    scorer: &dyn TopicScorer,
) -> anyhow::Result<RunSummary> {
    // A bad threshold is a run-level failure, checked before any record
    // is read or fetched, never a per-record marker.
    validate_threshold(options.threshold).context("invalid threshold")?;

    let reader = BufReader::new(
        File::open(input).with_context(|| format!("cannot open input file {}", input.display()))?,
    );

    let mut records = Vec::new();
    let mut summary = RunSummary::default();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("cannot read input file {}", input.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(&line) {
            Some(record) => records.push(record),
            None => {
                warn!(line = lineno + 1, "skipping invalid input line");
                summary.skipped += 1;
            }
        }
    }

    let mut writer = BufWriter::new(
        File::create(output)
            .with_context(|| format!("cannot create output file {}", output.display()))?,
    );

    let batch_size = options.batch_size.clamp(1, MAX_IDS_PER_REQUEST);
    for batch in records.chunks_mut(batch_size) {
        label_batch(batch, options, claims, scorer).await;
        for record in batch.iter() {
            if record.fields.contains_key("error") {
                summary.failed += 1;
            }
            writer.write_all(serde_json::to_string(&record.fields)?.as_bytes())?;
            writer.write_all(b"\n")?;
            summary.written += 1;
        }
    }
    writer
        .flush()
        .with_context(|| format!("cannot write output file {}", output.display()))?;

    info!(
        written = summary.written,
        skipped = summary.skipped,
        failed = summary.failed,
        "bulk labeling finished"
    );
    Ok(summary)
}

/// A usable record is a JSON object with a string QID field. The QID's
/// own syntax is checked later so a bad id still produces an output
/// record, just one with an error marker.
fn parse_record(line: &str) -> Option<Record> {
    let Ok(Value::Object(fields)) = serde_json::from_str(line) else {
        return None;
    };
    let raw_qid = fields.get(QID_FIELD)?.as_str()?.to_string();
    let qid = raw_qid.parse::<Qid>().map_err(|e| e.to_string());
    Some(Record { fields, qid })
}

/// Label one batch in place. The fetch happens as a single batched API
/// call over the records whose QIDs parsed.
async fn label_batch(
    batch: &mut [Record],
    options: &RunOptions,
    claims: &dyn ClaimSource,
    scorer: &dyn TopicScorer,
) {
    for record in batch.iter_mut() {
        if let Err(reason) = &record.qid {
            let reason = reason.clone();
            record.fields.insert("error".into(), json!(reason));
        }
    }

    let lookups: Vec<(usize, Qid)> = batch
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.qid.as_ref().ok().map(|q| (i, q.clone())))
        .collect();
    let qids: Vec<Qid> = lookups.iter().map(|(_, q)| q.clone()).collect();

    let fetched = match claims.fetch_entities(&qids).await {
        Ok(fetched) => fetched,
        Err(err) => {
            // Whole-call failure: every record in this batch gets the
            // marker, later batches still run.
            warn!(count = qids.len(), error = %err, "batch fetch failed");
            for (i, _) in &lookups {
                batch[*i].fields.insert("error".into(), json!(err.to_string()));
            }
            return;
        }
    };

    for ((i, _), outcome) in lookups.into_iter().zip(fetched) {
        match outcome {
            Ok(entity) => label_record(&mut batch[i], entity, options, scorer),
            Err(err) => {
                batch[i].fields.insert("error".into(), json!(err.to_string()));
            }
        }
    }
}

fn label_record(
    record: &mut Record,
    entity: wdtopic_core::Entity,
    options: &RunOptions,
    scorer: &dyn TopicScorer,
) {
    let tokens = match encode(&entity.claims, &options.encoder) {
        Ok(tokens) => tokens,
        Err(err) => {
            record.fields.insert("error".into(), json!(err.to_string()));
            return;
        }
    };
    let scores = match scorer.score(&tokens) {
        Ok(scores) => scores,
        Err(err) => {
            record.fields.insert("error".into(), json!(err.to_string()));
            return;
        }
    };
    let topics = match select_topics(&scores, options.threshold, options.threshold_mode) {
        Ok(topics) => topics,
        Err(err) => {
            record.fields.insert("error".into(), json!(err.to_string()));
            return;
        }
    };

    record
        .fields
        .insert("topics".into(), json!(topics));
    if options.debug {
        record
            .fields
            .insert("scores".into(), json!(rank_all(&scores)));
        record.fields.insert("claims".into(), json!(entity.claims));
    }
}
