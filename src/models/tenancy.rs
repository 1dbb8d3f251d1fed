// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Company (A "Empresa")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. User (apenas o necessário para as FKs do núcleo)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dono ou colaborador dentro da empresa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserType {
    Owner,
    Collaborator,
}

// Ciclo de vida do vínculo. Destruição modelada é desativação, nunca DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Inactive,
    Suspended,
}

// ---
// 3. UserCompany (A "Ponte" Usuário-Empresa)
// ---
// Liga um Usuário a uma Empresa sob um Cargo. No máximo UMA linha por
// usuário pode ter is_default = true (índice parcial único no banco +
// transação de set_as_default como defesa em profundidade).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserCompany {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role_id: Uuid,
    pub user_type: UserType,
    pub is_default: bool,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O Payload para criar uma empresa
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyPayload {
    #[validate(length(min = 1, message = "O nome da empresa é obrigatório."))]
    pub name: String,
}

// O Payload para vincular um usuário a uma empresa
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberPayload {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role_id: Uuid,
    pub user_type: UserType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_serializam_em_minusculas() {
        assert_eq!(
            serde_json::to_string(&UserType::Collaborator).unwrap(),
            "\"collaborator\""
        );
        assert_eq!(
            serde_json::to_string(&MembershipStatus::Suspended).unwrap(),
            "\"suspended\""
        );
    }
}
