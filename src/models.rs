pub mod catalog;
pub mod rbac;
pub mod tenancy;
