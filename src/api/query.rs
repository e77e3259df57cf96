use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::model::attendance::Status;
use crate::rules::calendar::DateRange;

/// Period selection shared by history, summary and export endpoints.
///
/// `startDate`/`endDate` win over `month`/`year`. `month` is zero-based
/// (0 = January) and a missing half of the pair falls back to the current one.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// Zero-based month, 0-11
    #[schema(example = 2)]
    pub month: Option<u32>,
    #[schema(example = 2026)]
    pub year: Option<i32>,
    #[schema(example = "2026-03-01", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-03-31", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
}

impl RangeQuery {
    /// The requested period, or `None` when nothing was asked for.
    pub fn range(&self, today: NaiveDate) -> Result<Option<DateRange>, ApiError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => return Ok(Some(DateRange::new(start, end)?)),
            (None, None) => {}
            _ => {
                return Err(ApiError::bad_request(
                    "startDate and endDate must be given together",
                ));
            }
        }

        if self.month.is_none() && self.year.is_none() {
            return Ok(None);
        }

        let month = self.month.unwrap_or(today.month0());
        let year = self.year.unwrap_or(today.year());
        Ok(Some(DateRange::month(year, month)?))
    }

    /// The requested period, defaulting to the month containing `today`.
    pub fn range_or_month(&self, today: NaiveDate) -> Result<DateRange, ApiError> {
        Ok(self
            .range(today)?
            .unwrap_or_else(|| DateRange::month_of(today)))
    }
}

/// Filters for the manager's team views.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TeamQuery {
    #[schema(example = "2026-03-02", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    #[schema(example = "late")]
    pub status: Option<Status>,
    pub user_id: Option<String>,
    #[schema(example = "IT")]
    pub department: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct TrendQuery {
    /// Days to look back, today included (1-90, default 7)
    #[schema(example = 7)]
    pub days: Option<u32>,
}

impl TrendQuery {
    pub const MAX_DAYS: u32 = 90;

    pub fn days(&self) -> u32 {
        self.days.unwrap_or(7).clamp(1, Self::MAX_DAYS)
    }
}
