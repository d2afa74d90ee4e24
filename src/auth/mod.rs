mod dto;
pub mod services;

pub use services::{login, logout, register};
