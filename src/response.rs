use serde::Serialize;
use utoipa::ToSchema;

/// Paging figures attached to list responses. Absent figures are left out of the JSON.
#[derive(Debug, Serialize, ToSchema, Clone, Default)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

impl Meta {
    pub fn paged(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    /// A collection returned whole.
    pub fn total(total: usize) -> Self {
        Self {
            total: Some(total as i64),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Envelope for every JSON body the API returns, errors included.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }

    pub fn failure(message: impl Into<String>, detail: T) -> Self {
        Self {
            message: message.into(),
            data: Some(detail),
            meta: Some(Meta::empty()),
        }
    }
}
