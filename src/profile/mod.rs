mod dto;
pub mod model;
pub mod services;

pub use model::Tier;
pub use services::{change_password, create_payment, user_info};
