// src/models/catalog.rs

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ---
// Catálogo hierárquico de funcionalidades
// ---
// Module 1—* Submodule 1—* Permission.
// Cada submódulo é a âncora de fronteira das permissões.

// O que sai do banco (Tabela Modules)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub route_path: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que sai do banco (Tabela Submodules)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Submodule {
    pub id: Uuid,
    pub module_id: Uuid,
    pub name: String,
    pub code: String,
    pub route_path: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submodule {
    /// Compõe a rota completa: rota do módulo + rota do submódulo, na ordem,
    /// sem inserir separador e sem normalizar barras duplicadas. Quem grava
    /// os caminhos é responsável pelas barras iniciais (validadas na escrita).
    pub fn full_route(&self, module: &Module) -> String {
        let mut route = String::new();
        if let Some(base) = &module.route_path {
            route.push_str(base);
        }
        if let Some(own) = &self.route_path {
            route.push_str(own);
        }
        route
    }
}

// O que sai do banco (Tabela Permissions)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub submodule_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Regra `isValidRoute`: rotas não vazias devem começar com '/'.
pub fn validate_route_path(route: &str) -> Result<(), ValidationError> {
    if route.is_empty() || route.starts_with('/') {
        return Ok(());
    }
    let mut err = ValidationError::new("invalid_route");
    err.message = Some(Cow::from("A rota deve começar com '/'."));
    Err(err)
}

// O Payload para criar um módulo
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateModulePayload {
    #[validate(length(min = 1, message = "O nome do módulo é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, message = "O código do módulo é obrigatório."))]
    pub code: String,

    #[validate(custom(function = validate_route_path))]
    pub route_path: Option<String>,
}

// O Payload para criar um submódulo
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmodulePayload {
    pub module_id: Uuid,

    #[validate(length(min = 1, message = "O nome do submódulo é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, message = "O código do submódulo é obrigatório."))]
    pub code: String,

    #[validate(custom(function = validate_route_path))]
    pub route_path: Option<String>,
}

// O Payload para criar uma permissão
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionPayload {
    #[validate(length(min = 1, message = "O nome da permissão é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, message = "O código da permissão é obrigatório."))]
    pub code: String,

    pub submodule_id: Uuid,
}
