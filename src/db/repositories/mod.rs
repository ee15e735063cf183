pub mod admin;
pub mod phone;
