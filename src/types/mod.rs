mod grade;
mod tract_id;

pub use grade::{HolcGrade, UNASSIGNED_LABEL};
pub use tract_id::{TractId, COUNTY_PREFIX};
