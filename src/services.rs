pub mod catalog_service;
pub use catalog_service::CatalogService;
pub mod rbac_service;
pub use rbac_service::RbacService;
pub mod company_service;
pub use company_service::CompanyService;
