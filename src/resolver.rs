// 🔍 Duplicate Resolver - pick exactly one row per duplicate group
// Priority cascade: no-payment preference, zero-agreement preference,
// lowest installment-code, then agreement / original-order tie-breaks.

use crate::error::ReconResult;
use crate::grouper::{self, Group, GroupKey, KeyColumns};
use crate::table::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// RULE NAMES
// ============================================================================

/// The cascade step that narrowed a group down to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleApplied {
    /// Group mixed paid and unpaid rows; the unpaid one was unique.
    NoPaymentPreference,

    /// Exactly one candidate had agreement_code = 0.
    ZeroAgreementPreference,

    /// Unique numerically smallest installment_code.
    LowestInstallmentCode,

    /// Installment codes tied; unique lowest agreement_code.
    AgreementTieBreak,

    /// Everything tied; the row appearing first in the input wins.
    OriginalOrder,
}

impl RuleApplied {
    pub fn name(&self) -> &'static str {
        match self {
            RuleApplied::NoPaymentPreference => "no-payment preference",
            RuleApplied::ZeroAgreementPreference => "zero-agreement preference",
            RuleApplied::LowestInstallmentCode => "lowest installment-code",
            RuleApplied::AgreementTieBreak => "lowest agreement-code tie-break",
            RuleApplied::OriginalOrder => "original order",
        }
    }
}

// ============================================================================
// RESOLUTION OUTPUT
// ============================================================================

/// The outcome for one duplicate group: exactly one chosen row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub key: GroupKey,
    /// Index of the winning row in the original dataset.
    pub row_index: usize,
    pub group_size: usize,
    pub rule: RuleApplied,
}

/// Accumulator returned by one resolution pass. Replaces shared counters:
/// everything the caller needs to report lives here, so the pass is safe
/// to run reentrantly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub total_rows: usize,
    pub duplicate_groups: usize,
    pub rows_selected: usize,
    /// Duplicate groups as a percentage of total input rows.
    pub duplication_rate: f64,
    /// How many groups each rule decided.
    pub rule_counts: BTreeMap<String, usize>,
    /// One audit line per resolved group.
    pub group_log: Vec<String>,
    /// Non-fatal normalization warnings (unparsable codes). These never
    /// interrupt processing.
    pub warnings: Vec<String>,
}

/// A full pass over one dataset.
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    pub resolutions: Vec<Resolution>,
    pub summary: ResolutionSummary,
}

// ============================================================================
// CANDIDATE NORMALIZATION
// ============================================================================

/// Per-row values the cascade operates on, normalized once up front so
/// sentinel and parse policy stay out of the rule logic.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    /// Original dataset index; also the final tie-break key.
    index: usize,
    /// Unparsable codes sort last so they can never win "lowest".
    installment_code: f64,
    /// None when the value is absent or unparsable: excluded from the
    /// zero-preference branch and sorted last in the tie-break.
    agreement: Option<f64>,
    has_payment: bool,
}

// ============================================================================
// RESOLVER ENGINE
// ============================================================================

pub struct DuplicateResolver {
    columns: KeyColumns,
}

impl DuplicateResolver {
    /// Locate the key columns up front; a missing required column aborts
    /// here, before any group is touched.
    pub fn new(dataset: &Dataset) -> ReconResult<Self> {
        Ok(DuplicateResolver {
            columns: KeyColumns::locate(dataset)?,
        })
    }

    /// Run one resolution pass: group, evaluate every group of size >= 2,
    /// and collect the accumulator.
    pub fn resolve(&self, dataset: &Dataset) -> ResolutionOutcome {
        let groups = grouper::group_duplicates(dataset, &self.columns);

        let mut resolutions = Vec::with_capacity(groups.len());
        let mut rule_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut group_log = Vec::with_capacity(groups.len());
        let mut warnings = Vec::new();

        for group in &groups {
            let resolution = self.evaluate(dataset, group, &mut warnings);

            *rule_counts
                .entry(resolution.rule.name().to_string())
                .or_insert(0) += 1;
            group_log.push(format!(
                "Group resolved: {} ({} rows) -> kept row {} [{}]",
                resolution.key,
                resolution.group_size,
                resolution.row_index + 2, // 1-based spreadsheet row, header included
                resolution.rule.name()
            ));
            resolutions.push(resolution);
        }

        let total_rows = dataset.len();
        let duplicate_groups = resolutions.len();
        let duplication_rate = if total_rows > 0 {
            duplicate_groups as f64 / total_rows as f64 * 100.0
        } else {
            0.0
        };

        ResolutionOutcome {
            summary: ResolutionSummary {
                total_rows,
                duplicate_groups,
                rows_selected: resolutions.len(),
                duplication_rate,
                rule_counts,
                group_log,
                warnings,
            },
            resolutions,
        }
    }

    /// Apply the cascade to one group. Total: always returns exactly one
    /// winner, never zero, never more than one.
    fn evaluate(&self, dataset: &Dataset, group: &Group, warnings: &mut Vec<String>) -> Resolution {
        let candidates = self.normalize_group(dataset, group, warnings);

        let mut pool: Vec<&Candidate> = candidates.iter().collect();
        debug_assert!(pool.len() >= 2);

        // Rule 1: when the group mixes paid and unpaid rows, only the
        // unpaid rows stay in contention. Skipped entirely when the
        // payment column is absent (all rows count as unpaid).
        if self.columns.payment_date.is_some() {
            let unpaid: Vec<&Candidate> =
                pool.iter().copied().filter(|c| !c.has_payment).collect();
            if !unpaid.is_empty() && unpaid.len() < pool.len() {
                pool = unpaid;
                if let [winner] = pool[..] {
                    return self.resolution(group, winner, RuleApplied::NoPaymentPreference);
                }
            }
        }

        // Rule 2: prefer rows whose agreement normalizes to exactly 0.
        // Unparsable values count as "not zero", never as an error.
        if self.columns.agreement_code.is_some() {
            let zeroed: Vec<&Candidate> = pool
                .iter()
                .copied()
                .filter(|c| c.agreement == Some(0.0))
                .collect();
            if !zeroed.is_empty() {
                pool = zeroed;
                if let [winner] = pool[..] {
                    return self.resolution(group, winner, RuleApplied::ZeroAgreementPreference);
                }
            }
        }

        // Rule 3: numerically smallest installment_code.
        let lowest = pool
            .iter()
            .map(|c| c.installment_code)
            .fold(f64::INFINITY, f64::min);
        pool.retain(|c| c.installment_code == lowest);
        if let [winner] = pool[..] {
            return self.resolution(group, winner, RuleApplied::LowestInstallmentCode);
        }

        // Tie-break (a): lowest agreement; absent/unparsable sorts last.
        if self.columns.agreement_code.is_some() {
            let lowest_agreement = pool
                .iter()
                .map(|c| c.agreement.unwrap_or(f64::INFINITY))
                .fold(f64::INFINITY, f64::min);
            pool.retain(|c| c.agreement.unwrap_or(f64::INFINITY) == lowest_agreement);
            if let [winner] = pool[..] {
                return self.resolution(group, winner, RuleApplied::AgreementTieBreak);
            }
        }

        // Tie-break (b): lowest original index. Guarantees totality.
        let winner = pool
            .iter()
            .copied()
            .min_by_key(|c| c.index)
            .expect("group has at least two rows");
        self.resolution(group, winner, RuleApplied::OriginalOrder)
    }

    fn normalize_group(
        &self,
        dataset: &Dataset,
        group: &Group,
        warnings: &mut Vec<String>,
    ) -> Vec<Candidate> {
        group
            .rows
            .iter()
            .map(|&index| {
                let row = &dataset.rows[index];

                let installment_cell = row.cell(self.columns.installment_code);
                let installment_code = match installment_cell.as_number() {
                    Some(n) => n,
                    None => {
                        warnings.push(format!(
                            "row {}: installment_code '{}' is not numeric; treated as highest",
                            index + 2,
                            installment_cell
                        ));
                        f64::INFINITY
                    }
                };

                let agreement = self.columns.agreement_code.and_then(|col| {
                    let cell = row.cell(col);
                    let parsed = cell.as_number();
                    if parsed.is_none() && !cell.is_missing() {
                        warnings.push(format!(
                            "row {}: agreement_code '{}' is not numeric; treated as non-zero",
                            index + 2,
                            cell
                        ));
                    }
                    parsed
                });

                let has_payment = self
                    .columns
                    .payment_date
                    .map(|col| !row.cell(col).is_payment_sentinel())
                    .unwrap_or(false);

                Candidate {
                    index,
                    installment_code,
                    agreement,
                    has_payment,
                }
            })
            .collect()
    }

    fn resolution(&self, group: &Group, winner: &Candidate, rule: RuleApplied) -> Resolution {
        Resolution {
            key: group.key.clone(),
            row_index: winner.index,
            group_size: group.rows.len(),
            rule,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
