// src/db/rbac_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::rbac::{Role, RolePermission};

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Criar o Cargo
    pub async fn create_role<'e, E>(
        &self,
        executor: E,
        name: &str,
        is_global: bool,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, is_global)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(is_global)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Já existe um cargo com esse nome.".into(),
                    );
                }
            }
            e.into()
        })
    }

    /// Leitura SEMPRE fresca do cargo. A regra global-vs-escopo revalida o
    /// estado atual de is_global a cada escrita, nunca uma cópia em cache —
    /// is_global muda independente das concessões já gravadas.
    pub async fn find_role_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn set_role_scope<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        is_global: bool,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET is_global = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(is_global)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::RoleNotFound)
    }

    /// Quantas concessões referenciam o cargo. Usado pela trava que impede
    /// mudar is_global com concessões pendentes.
    pub async fn count_grants_for_role<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM role_permissions WHERE role_id = $1")
                .bind(role_id)
                .fetch_one(executor)
                .await?;

        Ok(count.0)
    }

    // 2. Gravar a Concessão (cargo, permissão, empresa-ou-nulo)
    // O serviço já validou a regra de escopo; aqui só entram linhas válidas.
    pub async fn insert_grant<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_id: Uuid,
        company_id: Option<Uuid>,
    ) -> Result<RolePermission, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RolePermission>(
            r#"
            INSERT INTO role_permissions (role_id, permission_id, company_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .bind(company_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            let mapped = e.as_database_error().and_then(|db_err| {
                if db_err.is_unique_violation() {
                    return Some(AppError::UniqueConstraintViolation(
                        "Esta concessão já existe para o cargo.".into(),
                    ));
                }
                if db_err.is_foreign_key_violation() {
                    // O nome da constraint identifica qual referência falhou
                    return match db_err.constraint() {
                        Some("role_permissions_role_id_fkey") => Some(AppError::RoleNotFound),
                        Some("role_permissions_permission_id_fkey") => {
                            Some(AppError::PermissionNotFound)
                        }
                        Some("role_permissions_company_id_fkey") => {
                            Some(AppError::CompanyNotFound)
                        }
                        _ => None,
                    };
                }
                None
            });
            mapped.unwrap_or_else(|| e.into())
        })
    }

    pub async fn delete_grant<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_id: Uuid,
        company_id: Option<Uuid>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role_id = $1
              AND permission_id = $2
              AND company_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .bind(company_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// A consulta central do resolvedor: existe concessão para (cargo,
    /// permissão) no escopo pedido? `company_scope = None` consulta as
    /// concessões globais (company_id IS NULL).
    pub async fn find_grant(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        company_scope: Option<Uuid>,
    ) -> Result<Option<RolePermission>, AppError> {
        sqlx::query_as::<_, RolePermission>(
            r#"
            SELECT * FROM role_permissions
            WHERE role_id = $1
              AND permission_id = $2
              AND company_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .bind(company_scope)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list_grants_for_role(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<RolePermission>, AppError> {
        sqlx::query_as::<_, RolePermission>(
            "SELECT * FROM role_permissions WHERE role_id = $1 ORDER BY created_at",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }
}
