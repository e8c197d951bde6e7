pub mod attendance;
pub mod leave_balance;
pub mod leave_request;
pub mod loan;
pub mod payroll;
pub mod request;

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::config::Config;

/// `page` is 1-based; `per_page` is capped by `LIST_CAP`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 50)]
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: u32,
    pub per_page: u32,
    pub offset: u64,
}

impl PageQuery {
    pub fn resolve(self, config: &Config) -> Paging {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = config.page_size(self.per_page);
        Paging {
            page,
            per_page,
            offset: u64::from(page - 1) * u64::from(per_page),
        }
    }
}

/// Target cycle of a run.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct CycleRef {
    #[schema(example = 12)]
    pub month: u32,
    #[schema(example = 2025)]
    pub year: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_is_one_based_and_capped() {
        let config = Config::for_tests();
        let p = PageQuery { page: None, per_page: None }.resolve(&config);
        assert_eq!((p.page, p.per_page, p.offset), (1, 500, 0));

        let p = PageQuery { page: Some(3), per_page: Some(20) }.resolve(&config);
        assert_eq!(p.offset, 40);

        let p = PageQuery { page: Some(0), per_page: Some(9_999) }.resolve(&config);
        assert_eq!((p.page, p.per_page), (1, 500));
    }
}
