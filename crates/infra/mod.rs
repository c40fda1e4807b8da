pub mod db;
pub mod language_models;
pub mod memory;
pub mod speech;
pub mod storages;
