use serde::Serialize;

use crate::entities::phone_numbers;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Wire shape of a phone entry. Field casing is part of the panel/webhook
/// contract, hence camelCase.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberDto {
    pub id: i32,
    pub number: String,
    pub mode: String,
    pub tags: Vec<String>,
    pub notes: String,
    pub state: String,
    pub usage_count: i32,
    pub last_used: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<phone_numbers::Model> for PhoneNumberDto {
    fn from(model: phone_numbers::Model) -> Self {
        let tags: Vec<String> = serde_json::from_str(&model.tags).unwrap_or_default();
        Self {
            id: model.id,
            number: model.number,
            mode: model.mode,
            tags,
            notes: model.notes,
            state: model.state,
            usage_count: model.usage_count,
            last_used: model.last_used,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct StateCount {
    pub state: String,
    pub count: i64,
}
