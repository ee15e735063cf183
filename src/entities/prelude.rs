pub use super::admin_users::Entity as AdminUsers;
pub use super::phone_numbers::Entity as PhoneNumbers;
