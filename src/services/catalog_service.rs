// src/services/catalog_service.rs

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::db::CatalogRepository;
use crate::models::catalog::{
    CreateModulePayload, CreatePermissionPayload, CreateSubmodulePayload, Module, Permission,
    Submodule,
};

#[derive(Clone)]
pub struct CatalogService {
    catalog_repo: CatalogRepository,
    pool: PgPool,
}

impl CatalogService {
    pub fn new(catalog_repo: CatalogRepository, pool: PgPool) -> Self {
        Self { catalog_repo, pool }
    }

    pub async fn create_module(&self, payload: CreateModulePayload) -> Result<Module, AppError> {
        // A regra da rota ('/...') é validada aqui, na fronteira da escrita
        payload.validate()?;
        self.catalog_repo
            .create_module(
                &self.pool,
                &payload.name,
                &payload.code,
                payload.route_path.as_deref(),
            )
            .await
    }

    pub async fn get_module(&self, id: Uuid) -> Result<Module, AppError> {
        self.catalog_repo
            .find_module_by_id(id)
            .await?
            .ok_or(AppError::ModuleNotFound)
    }

    pub async fn list_modules(&self) -> Result<Vec<Module>, AppError> {
        self.catalog_repo.list_modules().await
    }

    pub async fn deactivate_module(&self, id: Uuid) -> Result<(), AppError> {
        self.catalog_repo.deactivate_module(&self.pool, id).await
    }

    pub async fn create_submodule(
        &self,
        payload: CreateSubmodulePayload,
    ) -> Result<Submodule, AppError> {
        payload.validate()?;
        self.catalog_repo
            .create_submodule(
                &self.pool,
                payload.module_id,
                &payload.name,
                &payload.code,
                payload.route_path.as_deref(),
            )
            .await
    }

    pub async fn get_submodule(&self, id: Uuid) -> Result<Submodule, AppError> {
        self.catalog_repo
            .find_submodule_by_id(id)
            .await?
            .ok_or(AppError::SubmoduleNotFound)
    }

    pub async fn list_submodules(&self, module_id: Uuid) -> Result<Vec<Submodule>, AppError> {
        self.catalog_repo.list_submodules_by_module(module_id).await
    }

    pub async fn deactivate_submodule(&self, id: Uuid) -> Result<(), AppError> {
        self.catalog_repo.deactivate_submodule(&self.pool, id).await
    }

    pub async fn create_permission(
        &self,
        payload: CreatePermissionPayload,
    ) -> Result<Permission, AppError> {
        payload.validate()?;
        self.catalog_repo
            .create_permission(&self.pool, &payload.name, &payload.code, payload.submodule_id)
            .await
    }

    pub async fn get_permission(&self, id: Uuid) -> Result<Permission, AppError> {
        self.catalog_repo
            .find_permission_by_id(id)
            .await?
            .ok_or(AppError::PermissionNotFound)
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.catalog_repo.list_all_permissions().await
    }

    pub async fn deactivate_permission(&self, id: Uuid) -> Result<(), AppError> {
        self.catalog_repo.deactivate_permission(&self.pool, id).await
    }

    /// A rota completa de um submódulo: rota do módulo dono + rota própria,
    /// concatenadas na ordem, sem normalização (ver Submodule::full_route).
    pub async fn full_route(&self, submodule_id: Uuid) -> Result<String, AppError> {
        let submodule = self.get_submodule(submodule_id).await?;
        let module = self.get_module(submodule.module_id).await?;
        Ok(submodule.full_route(&module))
    }
}
