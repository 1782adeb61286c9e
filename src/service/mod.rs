//! Query/validation/write engine over registered resources.

mod cast;
mod crud;
mod query;
mod validation;
pub use cast::{cast_value, parse_truthy};
pub use crud::{CrudService, PagedResult};
pub use query::{parse_ids, FilterValue, ListParams, ListQuery, PaginationParams, SortParam};
pub use validation::{build_rules, validate, FieldRules, Rule, TypeRule, WriteMode};
