//! Retrieval of monthly grids.

pub mod client;
pub mod retry;

pub use client::HttpGridSource;
pub use retry::RetryPolicy;

use crate::error::Result;
use crate::models::{MonthGrid, MonthPeriod};
use crate::utils::constants::{MONTH_PLACEHOLDER, YEAR_PLACEHOLDER};

/// Anything that can produce a month of gridded values
#[allow(async_fn_in_trait)]
pub trait GridSource {
    async fn fetch_month(&self, period: MonthPeriod) -> Result<MonthGrid>;
}

/// Fill `{year}` and zero-padded `{month}` into a URL template
pub fn render_url(template: &str, period: &MonthPeriod) -> String {
    template
        .replace(YEAR_PLACEHOLDER, &period.year.to_string())
        .replace(MONTH_PLACEHOLDER, &format!("{:02}", period.month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::DEFAULT_URL_TEMPLATE;

    #[test]
    fn test_render_default_template() {
        let period = MonthPeriod::new(2024, 5).unwrap();
        assert_eq!(
            render_url(DEFAULT_URL_TEMPLATE, &period),
            "https://www.ncei.noaa.gov/data/nclimgrid-daily/access/grids/2024/ncdd-202405-grd-scaled.nc"
        );
    }

    #[test]
    fn test_render_pads_month() {
        let period = MonthPeriod::new(2020, 1).unwrap();
        assert_eq!(render_url("{year}-{month}", &period), "2020-01");
    }
}
