//! Transaction plans and the generators that produce them.

use mvcc_core::TableId;
use rand::rngs::StdRng;
use rand::Rng;

/// One step of a [`TransactionPlan`], against a single table-qualified key.
#[derive(Debug, Clone)]
pub enum Step {
    /// Read a key; the value (if any) is discarded by the driver, matching
    /// a real workload that only cares about the read's effect on the
    /// transaction's read set.
    Read(TableId, Vec<u8>),
    /// Overwrite a key with a fresh value.
    Write(TableId, Vec<u8>, Vec<u8>),
    /// Insert a key expected not to already hold a value.
    Insert(TableId, Vec<u8>, Vec<u8>),
    /// Delete a key.
    Delete(TableId, Vec<u8>),
}

/// An ordered list of read/write/insert/delete steps making up one
/// transaction, as produced by a [`WorkloadGenerator`].
#[derive(Debug, Clone, Default)]
pub struct TransactionPlan {
    /// Steps to execute in order, within one `begin()`/`commit()` pair.
    pub steps: Vec<Step>,
}

impl TransactionPlan {
    /// An empty plan (a transaction with no work, which commits trivially).
    pub fn new() -> Self {
        TransactionPlan::default()
    }

    /// Append one step, builder-style.
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// Produces the next transaction's plan for one worker.
///
/// Implementations stand in for a real workload's parameter generator (a
/// TPC-C New-Order or Payment transaction profile); the core only needs the
/// resulting table/key/value shape.
pub trait WorkloadGenerator: Send + Sync {
    /// Produce the plan for the caller's next transaction.
    fn next_transaction(&self, rng: &mut StdRng) -> TransactionPlan;
}

/// A uniform-random single-table read/write mix: every transaction touches
/// `ops_per_transaction` keys drawn uniformly from `[0, key_space)`, each
/// step independently a read or a write according to `write_ratio`.
///
/// This is the reference generator the harness ships with; it is
/// deliberately simple, standing in for the TPC-C New-Order/Payment
/// generator the core was extracted from.
pub struct RandomKvWorkload {
    table: TableId,
    key_space: u64,
    ops_per_transaction: usize,
    write_ratio: f64,
}

impl RandomKvWorkload {
    /// A generator over `key_space` distinct keys in `table`, each
    /// transaction issuing `ops_per_transaction` steps, a fraction
    /// `write_ratio` (in `[0, 1]`) of which are writes.
    pub fn new(table: impl Into<TableId>, key_space: u64, ops_per_transaction: usize, write_ratio: f64) -> Self {
        RandomKvWorkload {
            table: table.into(),
            key_space: key_space.max(1),
            ops_per_transaction: ops_per_transaction.max(1),
            write_ratio: write_ratio.clamp(0.0, 1.0),
        }
    }

    fn random_key(&self, rng: &mut StdRng) -> Vec<u8> {
        let k = rng.gen_range(0..self.key_space);
        k.to_be_bytes().to_vec()
    }
}

impl WorkloadGenerator for RandomKvWorkload {
    fn next_transaction(&self, rng: &mut StdRng) -> TransactionPlan {
        let mut plan = TransactionPlan::new();
        for _ in 0..self.ops_per_transaction {
            let key = self.random_key(rng);
            if rng.gen_bool(self.write_ratio) {
                let value = rng.gen::<u64>().to_be_bytes().to_vec();
                plan = plan.with_step(Step::Write(self.table.clone(), key, value));
            } else {
                plan = plan.with_step(Step::Read(self.table.clone(), key));
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn generates_requested_op_count() {
        let workload = RandomKvWorkload::new("accounts", 1000, 5, 0.5);
        let mut rng = StdRng::seed_from_u64(1);
        let plan = workload.next_transaction(&mut rng);
        assert_eq!(plan.steps.len(), 5);
    }

    #[test]
    fn all_writes_when_ratio_is_one() {
        let workload = RandomKvWorkload::new("accounts", 1000, 10, 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        let plan = workload.next_transaction(&mut rng);
        assert!(plan.steps.iter().all(|s| matches!(s, Step::Write(..))));
    }

    #[test]
    fn all_reads_when_ratio_is_zero() {
        let workload = RandomKvWorkload::new("accounts", 1000, 10, 0.0);
        let mut rng = StdRng::seed_from_u64(7);
        let plan = workload.next_transaction(&mut rng);
        assert!(plan.steps.iter().all(|s| matches!(s, Step::Read(..))));
    }
}
