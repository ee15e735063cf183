use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "phone_numbers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Normalized number, E.164-preferred
    #[sea_orm(unique)]
    pub number: String,

    /// "CALL" or "OTP"
    pub mode: String,

    /// JSON array stored as string, insertion order preserved
    pub tags: String,

    pub notes: String,

    /// Full US state name, or "Unknown"
    pub state: String,

    pub usage_count: i32,

    pub last_used: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
