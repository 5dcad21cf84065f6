pub mod file_repository;
pub mod models;
pub mod repositories;
