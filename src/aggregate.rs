//! # Per-School Aggregation
//!
//! Groups stored evaluations by school and averages the scores per
//! criterion. A criterion absent from an evaluation contributes to neither
//! the sum nor the count of that criterion — two evaluations where only one
//! rates "limpeza" average limpeza over one sample, not two.

use std::collections::BTreeMap;

use crate::model::StoredEvaluation;

/// Running totals for one school while scanning the collection.
#[derive(Debug, Default)]
pub struct SchoolBucket {
    /// Evaluations seen for this school.
    pub count: usize,
    /// Per criterion: (score sum, contributing evaluation count).
    sums: BTreeMap<String, (f64, usize)>,
}

impl SchoolBucket {
    fn add(&mut self, scores: &BTreeMap<String, u8>) {
        self.count += 1;
        for (id, &score) in scores {
            let entry = self.sums.entry(id.clone()).or_insert((0.0, 0));
            entry.0 += score as f64;
            entry.1 += 1;
        }
    }

    /// Finalized averages, rounded to 2 decimal places, for every criterion
    /// that appears in at least one of the school's evaluations.
    pub fn averages(&self) -> BTreeMap<String, f64> {
        self.sums
            .iter()
            .map(|(id, &(sum, n))| (id.clone(), round2(sum / n as f64)))
            .collect()
    }
}

/// Scan the collection into per-school buckets, keyed by school name.
pub fn aggregate_by_school(records: &[StoredEvaluation]) -> BTreeMap<String, SchoolBucket> {
    let mut buckets: BTreeMap<String, SchoolBucket> = BTreeMap::new();
    for record in records {
        buckets
            .entry(record.school.clone())
            .or_default()
            .add(&record.scores);
    }
    buckets
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
