// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::catalog::{Module, Permission, Submodule};

// O repositório do catálogo de funcionalidades (módulos, submódulos e
// permissões). Métodos de escrita aceitam um executor (pool ou transação).
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Módulos
    // ---

    pub async fn create_module<'e, E>(
        &self,
        executor: E,
        name: &str,
        code: &str,
        route_path: Option<&str>,
    ) -> Result<Module, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Module>(
            r#"
            INSERT INTO modules (name, code, route_path)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(code)
        .bind(route_path)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Já existe um módulo com esse código.".into(),
                    );
                }
            }
            e.into()
        })
    }

    pub async fn find_module_by_id(&self, id: Uuid) -> Result<Option<Module>, AppError> {
        sqlx::query_as::<_, Module>("SELECT * FROM modules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn list_modules(&self) -> Result<Vec<Module>, AppError> {
        sqlx::query_as::<_, Module>("SELECT * FROM modules ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    /// Desativação é o caminho de destruição modelado (nunca DELETE).
    pub async fn deactivate_module<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE modules SET is_active = false, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ModuleNotFound);
        }
        Ok(())
    }

    // ---
    // Submódulos
    // ---

    pub async fn create_submodule<'e, E>(
        &self,
        executor: E,
        module_id: Uuid,
        name: &str,
        code: &str,
        route_path: Option<&str>,
    ) -> Result<Submodule, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Submodule>(
            r#"
            INSERT INTO submodules (module_id, name, code, route_path)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(module_id)
        .bind(name)
        .bind(code)
        .bind(route_path)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Já existe um submódulo com esse código.".into(),
                    );
                }
                // A FK garante que o submódulo referencia um módulo existente
                if db_err.is_foreign_key_violation() {
                    return AppError::ModuleNotFound;
                }
            }
            e.into()
        })
    }

    pub async fn find_submodule_by_id(&self, id: Uuid) -> Result<Option<Submodule>, AppError> {
        sqlx::query_as::<_, Submodule>("SELECT * FROM submodules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn list_submodules_by_module(
        &self,
        module_id: Uuid,
    ) -> Result<Vec<Submodule>, AppError> {
        sqlx::query_as::<_, Submodule>(
            "SELECT * FROM submodules WHERE module_id = $1 ORDER BY code",
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn deactivate_submodule<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE submodules SET is_active = false, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::SubmoduleNotFound);
        }
        Ok(())
    }

    // ---
    // Permissões
    // ---

    pub async fn create_permission<'e, E>(
        &self,
        executor: E,
        name: &str,
        code: &str,
        submodule_id: Uuid,
    ) -> Result<Permission, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (name, code, submodule_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(code)
        .bind(submodule_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Já existe uma permissão com esse código.".into(),
                    );
                }
                if db_err.is_foreign_key_violation() {
                    return AppError::SubmoduleNotFound;
                }
            }
            e.into()
        })
    }

    pub async fn find_permission_by_id(&self, id: Uuid) -> Result<Option<Permission>, AppError> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    /// Busca pelo código estável ("inventory:write"), independente do nome
    /// de exibição. O resolvedor de autorização entra por aqui.
    pub async fn find_permission_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Permission>, AppError> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    /// Lista todas as permissões do sistema (para o Frontend montar a tela)
    pub async fn list_all_permissions(&self) -> Result<Vec<Permission>, AppError> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn deactivate_permission<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE permissions SET is_active = false, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::PermissionNotFound);
        }
        Ok(())
    }
}
