// src/common/error.rs

use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
//
// Atenção à distinção do resolvedor de autorização: "permissão negada" NÃO é
// um erro — é um Ok(false). Os erros abaixo cobrem entidades ausentes,
// escritas inválidas e falhas de transação.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Regra global-vs-escopo (os dois lados da violação têm mensagens
    // próprias, para o chamador saber qual regra quebrou)
    #[error("Cargo global não pode receber concessão com empresa")]
    GlobalRoleWithCompany,

    #[error("Cargo não-global exige uma empresa na concessão")]
    ScopedRoleWithoutCompany,

    #[error("O escopo do cargo não pode mudar enquanto houver concessões que o referenciam")]
    RoleScopeLocked,

    #[error("{0}")]
    UniqueConstraintViolation(String),

    #[error("Cargo não encontrado")]
    RoleNotFound,

    #[error("Permissão não encontrada ou inativa")]
    PermissionNotFound,

    #[error("Módulo não encontrado")]
    ModuleNotFound,

    #[error("Submódulo não encontrado")]
    SubmoduleNotFound,

    #[error("Empresa não encontrada")]
    CompanyNotFound,

    #[error("Vínculo usuário-empresa não encontrado")]
    UserCompanyNotFound,

    #[error("Usuário não possui vínculo ativo com esta empresa")]
    NoActiveMembership,

    // Falha durante a transição de empresa padrão: rollback total,
    // o chamador observa o estado anterior intacto.
    #[error("Transação abortada: {0}")]
    TransactionError(String),

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}
