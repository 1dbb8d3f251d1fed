pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod company_repo;
pub use company_repo::CompanyRepository;
