use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        // keep (page - 1) * per_page inside i64
        let page = self.page.unwrap_or(1).clamp(1, i64::MAX / per_page);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}
