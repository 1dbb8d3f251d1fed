// src/db/company_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::tenancy::{Company, MembershipStatus, UserCompany, UserType};

// O repositório de empresas e vínculos usuário-empresa. As primitivas de
// travamento (FOR UPDATE) existem para a transição de empresa padrão, que é
// a única mutação multi-comando com invariante entre linhas.
#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
}

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Empresas
    // ---

    pub async fn create_company<'e, E>(&self, executor: E, name: &str) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name)
            VALUES ($1)
            RETURNING *
            "#,
        )
        .bind(name)
        .fetch_one(executor)
        .await
        .map_err(Into::into)
    }

    pub async fn find_company_by_id(&self, id: Uuid) -> Result<Option<Company>, AppError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    /// SELECT EXISTS: a consulta mais barata possível para a validação de
    /// concessões com escopo (empresa precisa existir).
    pub async fn company_exists(&self, id: Uuid) -> Result<bool, AppError> {
        let result: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM companies WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(result.0)
    }

    pub async fn deactivate_company<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE companies SET is_active = false, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::CompanyNotFound);
        }
        Ok(())
    }

    // ---
    // Vínculos (UserCompany)
    // ---

    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
        role_id: Uuid,
        user_type: UserType,
        is_default: bool,
    ) -> Result<UserCompany, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, UserCompany>(
            r#"
            INSERT INTO user_companies (user_id, company_id, role_id, user_type, is_default)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(role_id)
        .bind(user_type)
        .bind(is_default)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            let mapped = e.as_database_error().and_then(|db_err| {
                if db_err.is_unique_violation() {
                    return Some(AppError::UniqueConstraintViolation(
                        "Usuário já está vinculado a esta empresa.".into(),
                    ));
                }
                if db_err.is_foreign_key_violation() {
                    return match db_err.constraint() {
                        Some("user_companies_company_id_fkey") => Some(AppError::CompanyNotFound),
                        Some("user_companies_role_id_fkey") => Some(AppError::RoleNotFound),
                        _ => None,
                    };
                }
                None
            });
            mapped.unwrap_or_else(|| e.into())
        })
    }

    pub async fn find_membership_by_id(&self, id: Uuid) -> Result<Option<UserCompany>, AppError> {
        sqlx::query_as::<_, UserCompany>("SELECT * FROM user_companies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    /// O vínculo ATIVO do usuário com a empresa. Vínculos inativos ou
    /// suspensos não contam para o resolvedor de autorização.
    pub async fn find_active_membership(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<UserCompany>, AppError> {
        sqlx::query_as::<_, UserCompany>(
            r#"
            SELECT * FROM user_companies
            WHERE user_id = $1 AND company_id = $2 AND status = $3
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(MembershipStatus::Active)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_default_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserCompany>, AppError> {
        sqlx::query_as::<_, UserCompany>(
            "SELECT * FROM user_companies WHERE user_id = $1 AND is_default",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list_memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserCompany>, AppError> {
        sqlx::query_as::<_, UserCompany>(
            "SELECT * FROM user_companies WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn user_has_membership(&self, user_id: Uuid) -> Result<bool, AppError> {
        let result: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM user_companies WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(result.0)
    }

    /// Desativa o vínculo. Se ele era o padrão, a flag cai junto — um
    /// vínculo inativo não pode ser a empresa pré-selecionada no login.
    pub async fn deactivate_membership<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE user_companies
            SET status = $2, is_default = false, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(MembershipStatus::Inactive)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserCompanyNotFound);
        }
        Ok(())
    }

    // ---
    // Primitivas da transição de empresa padrão (sempre dentro de transação)
    // ---

    /// Trava (FOR UPDATE) TODOS os vínculos do usuário dono da linha-alvo,
    /// em ordem determinística (ORDER BY id). Ordem consistente de travamento
    /// entre transações concorrentes: elas se serializam em vez de entrar em
    /// deadlock. Alvo inexistente retorna lista vazia.
    pub async fn lock_memberships_of_user<'e, E>(
        &self,
        executor: E,
        membership_id: Uuid,
    ) -> Result<Vec<UserCompany>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, UserCompany>(
            r#"
            SELECT * FROM user_companies
            WHERE user_id = (SELECT user_id FROM user_companies WHERE id = $1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(membership_id)
        .fetch_all(executor)
        .await
        .map_err(Into::into)
    }

    /// Passo "limpar irmãos": derruba is_default das demais linhas do usuário.
    pub async fn clear_other_defaults<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        except_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE user_companies
            SET is_default = false, updated_at = now()
            WHERE user_id = $1 AND id <> $2 AND is_default
            "#,
        )
        .bind(user_id)
        .bind(except_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Passo "marcar a si": liga is_default na linha-alvo.
    pub async fn mark_default<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE user_companies
            SET is_default = true, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
