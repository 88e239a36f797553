// Submodules for separation of concerns
mod compare;
mod cursor;
mod eval;
mod exec;
mod parse;
pub(crate) mod types;
pub(crate) mod update;

pub use compare::{are_comparable, compare, compare_options, equal, things_equal};
pub use cursor::{CandidateSource, Cursor};
pub use eval::{compare_docs, eval_filter, match_document};
pub use exec::{count, find_one, plan_remove, plan_update};
pub use parse::{parse_filter_json, parse_query, parse_sort, parse_update, parse_update_json};
pub use types::{
    CmpOp, DeleteReport, Filter, FindOptions, Modifier, Order, SortSpec, UpdateDoc,
    UpdateOptions, UpdateReport,
};
pub use update::{apply_update, modify};
