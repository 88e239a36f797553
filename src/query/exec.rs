//! One-shot query helpers layered on a `CandidateSource`. Mutating operations only plan here:
//! they compute every replacement up front so the caller can commit all of them or none.

use crate::document::{Document, check_document};
use crate::errors::DbError;
use crate::types::Map;
use crate::utils::num::{u128_to_u64_saturating, usize_to_u64};
use std::sync::Arc;
use std::time::Instant;

use super::cursor::{CandidateSource, Cursor};
use super::eval::eval_filter;
use super::parse::{parse_query, parse_update};
use super::types::UpdateOptions;
use super::update::apply_update;

/// # Errors
/// Returns `DbError::Query` when the query is malformed.
pub fn count<S: CandidateSource + ?Sized>(source: &S, query: &Map) -> Result<usize, DbError> {
    let filter = parse_query(query)?;
    let start = Instant::now();
    let n = source.get_candidates(query).iter().filter(|d| eval_filter(d.as_map(), &filter)).count();
    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"count\",\"duration_ms\":{},\"result_count\":{}}}",
        u128_to_u64_saturating(start.elapsed().as_millis()),
        usize_to_u64(n)
    );
    Ok(n)
}

/// # Errors
/// Returns `DbError::Query` when the query is malformed.
pub fn find_one<S: CandidateSource + ?Sized>(
    source: &S,
    query: &Map,
) -> Result<Option<Document>, DbError> {
    Ok(Cursor::new(source, query.clone()).limit(1).exec()?.into_iter().next())
}

/// Matches `query` and computes the updated form of each matched document, stopping after
/// the first match unless `opts.multi` is set. Returns `(before, after)` pairs.
///
/// # Errors
/// Fails as a whole on a malformed query or update, or when any single modification or
/// validation fails; nothing is returned in that case.
pub fn plan_update<S: CandidateSource + ?Sized>(
    source: &S,
    query: &Map,
    update: &Map,
    opts: UpdateOptions,
) -> Result<Vec<(Arc<Document>, Document)>, DbError> {
    let filter = parse_query(query)?;
    let update = parse_update(update)?;
    let mut planned = Vec::new();
    for doc in source.get_candidates(query) {
        if !eval_filter(doc.as_map(), &filter) {
            continue;
        }
        let next = apply_update(&doc, &update)?;
        check_document(&next)?;
        planned.push((doc, next));
        if !opts.multi {
            break;
        }
    }
    Ok(planned)
}

/// # Errors
/// Returns `DbError::Query` when the query is malformed.
pub fn plan_remove<S: CandidateSource + ?Sized>(
    source: &S,
    query: &Map,
    multi: bool,
) -> Result<Vec<Arc<Document>>, DbError> {
    let filter = parse_query(query)?;
    let mut doomed = Vec::new();
    for doc in source.get_candidates(query) {
        if eval_filter(doc.as_map(), &filter) {
            doomed.push(doc);
            if !multi {
                break;
            }
        }
    }
    Ok(doomed)
}
