//! Report statistics over a decoded log.
//!
//! [`Summary`] is a pure function of a record sequence: a single forward
//! fold, visiting each record exactly once. Sums and counts do not depend
//! on record order, so a summary can be recomputed at any time from the
//! same log with the same result.
use crate::record::Record;
use serde::Serialize;

/// Totals and counts for one pass over a record sequence, plus the balance
/// of a single user of interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// Sum of all Debit amounts.
    pub total_debits: f64,
    /// Sum of all Credit amounts.
    pub total_credits: f64,
    pub autopay_starts: u64,
    pub autopay_ends: u64,
    /// User the `balance` field was computed for.
    pub user_id: u64,
    /// Credits minus debits for `user_id`.
    pub balance: f64,
}

impl Summary {
    fn new(user_id: u64) -> Self {
        Summary {
            total_debits: 0.0,
            total_credits: 0.0,
            autopay_starts: 0,
            autopay_ends: 0,
            user_id,
            balance: 0.0,
        }
    }

    /// Fold the record sequence into a summary for `target_user`.
    pub fn collect(records: &[Record], target_user: u64) -> Self {
        records.iter().fold(Summary::new(target_user), Summary::apply)
    }

    fn apply(mut self, record: &Record) -> Self {
        let mine = record.base().user_id == self.user_id;
        match record {
            Record::Debit { amount, .. } => {
                self.total_debits += *amount;
                if mine {
                    self.balance -= *amount;
                }
            }
            Record::Credit { amount, .. } => {
                self.total_credits += *amount;
                if mine {
                    self.balance += *amount;
                }
            }
            Record::StartAutopay { .. } => self.autopay_starts += 1,
            Record::EndAutopay { .. } => self.autopay_ends += 1,
            // Unknown tags contribute to no statistic.
            Record::Unknown { .. } => {}
        }
        self
    }
}
