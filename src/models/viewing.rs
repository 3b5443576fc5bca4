use serde::{Deserialize, Serialize};
use validator::Validate;

/// One row of the reporting join: a subscriber's total viewing time in one
/// category/subcategory pair.
///
/// `total_duration` is `None` when the subscriber has no sessions at all
/// (the outer side of the join).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ViewingRecord {
    #[validate(length(min = 1, max = 50))]
    pub client_id: String,

    pub gender: Option<String>,
    pub age_range: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,

    #[validate(range(min = 0))]
    pub total_duration: Option<i64>,
}

impl ViewingRecord {
    pub fn new(
        client_id: impl Into<String>,
        gender: Option<&str>,
        age_range: Option<&str>,
        category: Option<&str>,
        subcategory: Option<&str>,
        total_duration: Option<i64>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            gender: gender.map(str::to_string),
            age_range: age_range.map(str::to_string),
            category: category.map(str::to_string),
            subcategory: subcategory.map(str::to_string),
            total_duration,
        }
    }
}
