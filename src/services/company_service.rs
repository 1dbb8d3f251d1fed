// src/services/company_service.rs

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::db::CompanyRepository;
use crate::models::tenancy::{AddMemberPayload, Company, CreateCompanyPayload, UserCompany};

#[derive(Clone)]
pub struct CompanyService {
    company_repo: CompanyRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl CompanyService {
    pub fn new(company_repo: CompanyRepository, pool: PgPool) -> Self {
        Self { company_repo, pool }
    }

    pub async fn create_company(&self, payload: CreateCompanyPayload) -> Result<Company, AppError> {
        payload.validate()?;
        self.company_repo.create_company(&self.pool, &payload.name).await
    }

    pub async fn get_company(&self, company_id: Uuid) -> Result<Company, AppError> {
        self.company_repo
            .find_company_by_id(company_id)
            .await?
            .ok_or(AppError::CompanyNotFound)
    }

    pub async fn deactivate_company(&self, company_id: Uuid) -> Result<(), AppError> {
        self.company_repo.deactivate_company(&self.pool, company_id).await
    }

    /// Vincula um usuário a uma empresa sob um cargo. O PRIMEIRO vínculo do
    /// usuário nasce como padrão (o cliente precisa de uma empresa para
    /// pré-selecionar no login).
    pub async fn add_member(&self, payload: AddMemberPayload) -> Result<UserCompany, AppError> {
        let is_first = !self.company_repo.user_has_membership(payload.user_id).await?;

        // O índice parcial único segura a corrida entre dois "primeiros
        // vínculos" simultâneos: um deles falha na escrita, nunca commitam
        // dois padrões.
        self.company_repo
            .add_member(
                &self.pool,
                payload.user_id,
                payload.company_id,
                payload.role_id,
                payload.user_type,
                is_first,
            )
            .await
    }

    pub async fn get_membership(&self, id: Uuid) -> Result<UserCompany, AppError> {
        self.company_repo
            .find_membership_by_id(id)
            .await?
            .ok_or(AppError::UserCompanyNotFound)
    }

    pub async fn list_user_memberships(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserCompany>, AppError> {
        self.company_repo.list_memberships_for_user(user_id).await
    }

    pub async fn get_default_company(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserCompany>, AppError> {
        self.company_repo.find_default_for_user(user_id).await
    }

    pub async fn deactivate_membership(&self, id: Uuid) -> Result<(), AppError> {
        self.company_repo.deactivate_membership(&self.pool, id).await
    }

    /// Torna o vínculo dado a empresa padrão do usuário.
    ///
    /// Protocolo "limpa irmãos, marca a si", numa única transação:
    /// qualquer falha em qualquer passo aborta TUDO — o chamador observa o
    /// estado anterior intacto (nada de limpar-sem-marcar nem
    /// marcar-sem-limpar). As linhas do usuário são travadas (FOR UPDATE)
    /// para que duas chamadas concorrentes se serializem; o índice parcial
    /// único no banco é a garantia autoritativa do invariante.
    pub async fn set_as_default(&self, user_company_id: Uuid) -> Result<UserCompany, AppError> {
        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Aplica a transição sobre a conexão da transação
        let target = self
            .apply_default_transition(&mut *tx, user_company_id)
            .await?;

        // 3. Commit atômico (falhou? rollback, estado anterior intacto)
        tx.commit()
            .await
            .map_err(|e| AppError::TransactionError(e.to_string()))?;

        tracing::info!(
            user_id = %target.user_id,
            user_company_id = %target.id,
            "Empresa padrão do usuário atualizada"
        );

        self.company_repo
            .find_membership_by_id(target.id)
            .await?
            .ok_or(AppError::UserCompanyNotFound)
    }

    /// O miolo da transição, como função sobre um handle transacional
    /// explícito — nenhuma mutação escondida de objetos do chamador.
    async fn apply_default_transition(
        &self,
        conn: &mut sqlx::PgConnection,
        user_company_id: Uuid,
    ) -> Result<UserCompany, AppError> {
        // 1. Trava todos os vínculos do usuário dono da linha-alvo, em ordem
        // determinística (chamadas concorrentes se serializam aqui)
        let locked = self
            .company_repo
            .lock_memberships_of_user(&mut *conn, user_company_id)
            .await?;
        let target = locked
            .into_iter()
            .find(|m| m.id == user_company_id)
            .ok_or(AppError::UserCompanyNotFound)?;

        // 2. Limpa is_default dos irmãos
        self.company_repo
            .clear_other_defaults(&mut *conn, target.user_id, target.id)
            .await
            .map_err(|e| AppError::TransactionError(e.to_string()))?;

        // 3. Marca a linha-alvo
        let marked = self
            .company_repo
            .mark_default(&mut *conn, target.id)
            .await
            .map_err(|e| AppError::TransactionError(e.to_string()))?;
        if marked == 0 {
            return Err(AppError::TransactionError(
                "vínculo-alvo sumiu durante a transição".into(),
            ));
        }

        Ok(target)
    }
}
