// src/models/rbac.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// O que sai do banco (Tabela Roles)
//
// is_global = true  => as concessões do cargo valem para todas as empresas
//                      e NÃO carregam company_id.
// is_global = false => cada concessão precisa nomear a empresa onde vale.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub is_global: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que sai do banco (Tabela RolePermissions)
// A associação tripla (cargo, permissão, empresa-ou-nulo).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O Payload para criar um cargo
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[validate(length(min = 1, message = "O nome do cargo é obrigatório."))]
    pub name: String,

    #[serde(default)]
    pub is_global: bool,
}

// O Payload para conceder uma permissão a um cargo
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionPayload {
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub company_id: Option<Uuid>,
}
