//! Exact reference matching of extracted tokens against the case set

use crate::models::{Case, ReferenceToken};
use std::collections::HashMap;
use tracing::warn;

/// Cases that share one reference (compared ignoring case)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateReference {
    /// Reference as stored on the first case carrying it
    pub reference: String,
    /// Ids of all cases carrying it, in iteration order
    pub case_ids: Vec<i64>,
}

/// Find the case whose reference equals `token`, ignoring case
///
/// Returns the first such case in iteration order. A second case with the same
/// reference is an upstream integrity problem; it is logged, never resolved here.
pub fn match_case<'a>(token: Option<&ReferenceToken>, cases: &'a [Case]) -> Option<&'a Case> {
    let token = token?;
    let mut carriers = cases
        .iter()
        .filter(|case| case.reference.as_deref().is_some_and(|r| token.matches(r)));

    let first = carriers.next()?;
    let others: Vec<i64> = carriers.map(|case| case.id).collect();
    if !others.is_empty() {
        warn!(
            "Duplicate case reference {}: matched case {} but cases {:?} carry it too",
            token, first.id, others
        );
    }
    Some(first)
}

/// Report every reference carried by more than one case
pub fn find_duplicate_references(cases: &[Case]) -> Vec<DuplicateReference> {
    let mut by_reference: HashMap<String, usize> = HashMap::new();
    let mut seen: Vec<DuplicateReference> = Vec::new();

    for case in cases {
        let Some(reference) = case.reference.as_deref() else {
            continue;
        };
        let key = reference.to_ascii_lowercase();
        match by_reference.get(&key) {
            Some(&index) => seen[index].case_ids.push(case.id),
            None => {
                by_reference.insert(key, seen.len());
                seen.push(DuplicateReference {
                    reference: reference.to_string(),
                    case_ids: vec![case.id],
                });
            }
        }
    }

    seen.into_iter().filter(|d| d.case_ids.len() > 1).collect()
}
