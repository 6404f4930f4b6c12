pub mod configure;
pub mod db;
pub mod logger;
pub mod models;
pub mod repository;
pub mod transfer;
