pub mod db;
pub mod delivery_services;
pub mod form;
pub mod models;
pub mod query;
pub mod services;
pub mod views;
