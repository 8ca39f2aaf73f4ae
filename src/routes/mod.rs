pub mod database;
pub mod health;
pub mod info;
