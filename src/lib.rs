// src/lib.rs
//
// Núcleo de controle de acesso multi-tenant de um backend de gestão
// (empresas, usuários, cargos, permissões). Este crate é uma biblioteca:
// a camada HTTP que o consome vive fora daqui.

pub mod common;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

pub use common::error::AppError;
pub use config::{AppState, run_migrations};
pub use services::{CatalogService, CompanyService, RbacService};
