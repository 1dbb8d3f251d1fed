// src/services/rbac_service.rs

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::db::{CatalogRepository, CompanyRepository, RbacRepository};
use crate::models::rbac::{CreateRolePayload, Role, RolePermission};

/// A regra global-vs-escopo, como decisão pura sobre o estado ATUAL do cargo:
/// - cargo global  => a concessão não pode carregar empresa;
/// - cargo com escopo => a concessão precisa nomear uma empresa.
/// A existência da empresa é verificada à parte (precisa do banco).
pub fn validate_role_scope(is_global: bool, company_id: Option<Uuid>) -> Result<(), AppError> {
    match (is_global, company_id) {
        (true, Some(_)) => Err(AppError::GlobalRoleWithCompany),
        (false, None) => Err(AppError::ScopedRoleWithoutCompany),
        _ => Ok(()),
    }
}

// O serviço recebe os repositórios explicitamente (injeção de dependência
// montada uma vez no AppState) — nada de registro global de modelos.
#[derive(Clone)]
pub struct RbacService {
    rbac_repo: RbacRepository,
    catalog_repo: CatalogRepository,
    company_repo: CompanyRepository,
    pool: PgPool,
}

impl RbacService {
    pub fn new(
        rbac_repo: RbacRepository,
        catalog_repo: CatalogRepository,
        company_repo: CompanyRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            rbac_repo,
            catalog_repo,
            company_repo,
            pool,
        }
    }

    pub async fn create_role(&self, payload: CreateRolePayload) -> Result<Role, AppError> {
        payload.validate()?;
        self.rbac_repo
            .create_role(&self.pool, &payload.name, payload.is_global)
            .await
    }

    pub async fn get_role(&self, role_id: Uuid) -> Result<Role, AppError> {
        self.rbac_repo
            .find_role_by_id(role_id)
            .await?
            .ok_or(AppError::RoleNotFound)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        self.rbac_repo.list_roles().await
    }

    /// Concede uma permissão a um cargo, dentro do escopo pedido.
    ///
    /// Operação explícita em dois passos (nunca um validador implícito de
    /// campo consultando tabela irmã):
    /// 1. Busca o cargo — leitura fresca, is_global pode ter mudado;
    /// 2. Valida o payload contra ele (+ existência da empresa, se escopo);
    /// 3. Grava.
    pub async fn grant_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        company_id: Option<Uuid>,
    ) -> Result<RolePermission, AppError> {
        // 1. Cargo, estado atual
        let role = self
            .rbac_repo
            .find_role_by_id(role_id)
            .await?
            .ok_or(AppError::RoleNotFound)?;

        // 2. Regra de escopo
        validate_role_scope(role.is_global, company_id)?;

        // 2b. Concessão com escopo exige empresa existente
        if let Some(company_id) = company_id {
            if !self.company_repo.company_exists(company_id).await? {
                return Err(AppError::CompanyNotFound);
            }
        }

        // 3. Grava (FKs do banco seguram corrida com remoção concorrente)
        let grant = self
            .rbac_repo
            .insert_grant(&self.pool, role_id, permission_id, company_id)
            .await?;

        tracing::info!(
            role = %role.name,
            permission_id = %permission_id,
            company_id = ?company_id,
            "Permissão concedida ao cargo"
        );

        Ok(grant)
    }

    pub async fn revoke_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        company_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        self.rbac_repo
            .delete_grant(&self.pool, role_id, permission_id, company_id)
            .await
    }

    /// Muda o escopo (is_global) de um cargo.
    ///
    /// Decisão explícita para a questão em aberto da regra §global-vs-escopo:
    /// com concessões já referenciando o cargo, a mudança é REJEITADA — o
    /// contrário deixaria linhas órfãs-inválidas ou reescreveria concessões
    /// em cascata por baixo dos panos. Revogue as concessões primeiro.
    pub async fn set_role_scope(&self, role_id: Uuid, is_global: bool) -> Result<Role, AppError> {
        let mut tx = self.pool.begin().await?;

        let referenced = self
            .rbac_repo
            .count_grants_for_role(&mut *tx, role_id)
            .await?;
        if referenced > 0 {
            return Err(AppError::RoleScopeLocked);
        }

        let role = self
            .rbac_repo
            .set_role_scope(&mut *tx, role_id, is_global)
            .await?;

        tx.commit().await?;
        Ok(role)
    }

    pub async fn list_role_grants(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<RolePermission>, AppError> {
        self.rbac_repo.list_grants_for_role(role_id).await
    }

    /// O resolvedor de autorização: o usuário pode executar `permission_code`
    /// dentro de `company_id`?
    ///
    /// Ok(false) é "negado" — resultado válido, não erro. Erros são reservados
    /// para entidades ausentes: permissão inexistente/inativa e vínculo ativo
    /// inexistente.
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        permission_code: &str,
    ) -> Result<bool, AppError> {
        // 1. Permissão pelo código (inativa conta como ausente)
        let permission = self
            .catalog_repo
            .find_permission_by_code(permission_code)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AppError::PermissionNotFound)?;

        // 2. Vínculo ATIVO do usuário com a empresa
        let membership = self
            .company_repo
            .find_active_membership(user_id, company_id)
            .await?
            .ok_or(AppError::NoActiveMembership)?;

        // 3. O cargo do vínculo decide o escopo da consulta
        let role = self
            .rbac_repo
            .find_role_by_id(membership.role_id)
            .await?
            .ok_or(AppError::RoleNotFound)?;

        // 4. Cargo global consulta SOMENTE concessões sem empresa; cargo com
        // escopo consulta somente as da empresa pedida. Escolha de política
        // explícita: concessões de cargo global independem de empresa, e
        // sobrescritas por empresa não são consultadas para ele.
        let company_scope = if role.is_global {
            None
        } else {
            Some(company_id)
        };

        let grant = self
            .rbac_repo
            .find_grant(role.id, permission.id, company_scope)
            .await?;

        let allowed = grant.is_some();
        tracing::debug!(
            user_id = %user_id,
            company_id = %company_id,
            permission = permission_code,
            allowed,
            "Resolução de autorização"
        );

        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cargo_global_nao_aceita_empresa() {
        let err = validate_role_scope(true, Some(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, AppError::GlobalRoleWithCompany));
    }

    #[test]
    fn cargo_com_escopo_exige_empresa() {
        let err = validate_role_scope(false, None).unwrap_err();
        assert!(matches!(err, AppError::ScopedRoleWithoutCompany));
    }

    #[test]
    fn combinacoes_validas_passam() {
        assert!(validate_role_scope(true, None).is_ok());
        assert!(validate_role_scope(false, Some(Uuid::new_v4())).is_ok());
    }
}
