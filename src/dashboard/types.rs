use chrono::NaiveDate;
use serde::Deserialize;

/// `?as_of=YYYY-MM-DD`; defaults to today (UTC)
#[derive(Debug, Default, Deserialize)]
pub struct AsOfParams {
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

/// `?sort=luck|average|perfect|games`
#[derive(Debug, Default, Deserialize)]
pub struct LaneParams {
    pub sort: Option<String>,
}
