// tests/access_control.rs
//
// Testes de integração do núcleo de controle de acesso. Precisam de um
// Postgres real (DATABASE_URL) e por isso ficam atrás da feature:
//
//   cargo test --features integration-tests
//
#![cfg(feature = "integration-tests")]

use gestao_core::common::error::AppError;
use gestao_core::config::{AppState, run_migrations};
use gestao_core::models::catalog::{
    CreateModulePayload, CreatePermissionPayload, CreateSubmodulePayload, Permission,
};
use gestao_core::models::rbac::{CreateRolePayload, Role};
use gestao_core::models::tenancy::{AddMemberPayload, Company, CreateCompanyPayload, UserType};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn setup() -> AppState {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida para os testes");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Falha ao conectar ao banco de testes");

    run_migrations(&pool).await.expect("Falha nas migrações");

    AppState::with_pool(pool)
}

// Os usuários ficam fora da superfície CRUD do núcleo; os testes os inserem
// direto na tabela.
async fn create_user(pool: &PgPool) -> Uuid {
    let row: (Uuid,) = sqlx::query_as("INSERT INTO users (email) VALUES ($1) RETURNING id")
        .bind(format!("teste-{}@exemplo.com", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .expect("Falha ao criar usuário de teste");
    row.0
}

// Códigos precisam ser únicos entre execuções (o banco de testes é
// compartilhado); sufixamos tudo com um UUID.
fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

async fn create_company(state: &AppState, name: &str) -> Company {
    state
        .company_service
        .create_company(CreateCompanyPayload {
            name: unique(name),
        })
        .await
        .expect("Falha ao criar empresa")
}

async fn create_permission(state: &AppState, code: &str) -> Permission {
    let module = state
        .catalog_service
        .create_module(CreateModulePayload {
            name: "Módulo de teste".into(),
            code: unique("mod"),
            route_path: Some("/teste".into()),
        })
        .await
        .expect("Falha ao criar módulo");

    let submodule = state
        .catalog_service
        .create_submodule(CreateSubmodulePayload {
            module_id: module.id,
            name: "Submódulo de teste".into(),
            code: unique("sub"),
            route_path: Some("/itens".into()),
        })
        .await
        .expect("Falha ao criar submódulo");

    state
        .catalog_service
        .create_permission(CreatePermissionPayload {
            name: "Permissão de teste".into(),
            code: code.to_string(),
            submodule_id: submodule.id,
        })
        .await
        .expect("Falha ao criar permissão")
}

async fn create_role(state: &AppState, name: &str, is_global: bool) -> Role {
    state
        .rbac_service
        .create_role(CreateRolePayload {
            name: unique(name),
            is_global,
        })
        .await
        .expect("Falha ao criar cargo")
}

async fn count_defaults(pool: &PgPool, user_id: Uuid) -> i64 {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM user_companies WHERE user_id = $1 AND is_default")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

// ---
// Regra global-vs-escopo (§ concessões)
// ---

#[tokio::test]
async fn concessao_com_empresa_para_cargo_global_e_rejeitada() {
    let state = setup().await;
    let role = create_role(&state, "superadmin", true).await;
    let permission = create_permission(&state, &unique("manage_all")).await;
    let company = create_company(&state, "ACME").await;

    let err = state
        .rbac_service
        .grant_permission(role.id, permission.id, Some(company.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::GlobalRoleWithCompany));
}

#[tokio::test]
async fn concessao_sem_empresa_para_cargo_com_escopo_e_rejeitada() {
    let state = setup().await;
    let role = create_role(&state, "gerente", false).await;
    let permission = create_permission(&state, &unique("edit_prices")).await;

    let err = state
        .rbac_service
        .grant_permission(role.id, permission.id, None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ScopedRoleWithoutCompany));
}

#[tokio::test]
async fn concessao_com_escopo_exige_empresa_existente() {
    let state = setup().await;
    let role = create_role(&state, "gerente", false).await;
    let permission = create_permission(&state, &unique("edit_prices")).await;

    let err = state
        .rbac_service
        .grant_permission(role.id, permission.id, Some(Uuid::new_v4()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::CompanyNotFound));
}

#[tokio::test]
async fn escopo_do_cargo_trava_com_concessoes_pendentes() {
    let state = setup().await;
    let role = create_role(&state, "gerente", false).await;
    let permission = create_permission(&state, &unique("edit_prices")).await;
    let company = create_company(&state, "ACME").await;

    state
        .rbac_service
        .grant_permission(role.id, permission.id, Some(company.id))
        .await
        .unwrap();

    let err = state
        .rbac_service
        .set_role_scope(role.id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RoleScopeLocked));

    // Revogando a concessão, a mudança passa
    state
        .rbac_service
        .revoke_permission(role.id, permission.id, Some(company.id))
        .await
        .unwrap();
    let role = state.rbac_service.set_role_scope(role.id, true).await.unwrap();
    assert!(role.is_global);
}

// ---
// Resolvedor de autorização
// ---

#[tokio::test]
async fn cenario_gerente_com_escopo_de_empresa() {
    let state = setup().await;
    let company = create_company(&state, "C1").await;
    let role = create_role(&state, "gerente", false).await;
    let code = unique("edit_prices");
    let permission = create_permission(&state, &code).await;
    let user = create_user(&state.db_pool).await;

    state
        .rbac_service
        .grant_permission(role.id, permission.id, Some(company.id))
        .await
        .unwrap();
    state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: company.id,
            role_id: role.id,
            user_type: UserType::Collaborator,
        })
        .await
        .unwrap();

    // Dentro da empresa: permitido
    let allowed = state
        .rbac_service
        .has_permission(user, company.id, &code)
        .await
        .unwrap();
    assert!(allowed);

    // Em outra empresa, SEM vínculo: erro (não um false)
    let other = create_company(&state, "C2").await;
    let err = state
        .rbac_service
        .has_permission(user, other.id, &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoActiveMembership));
}

#[tokio::test]
async fn cargo_global_vale_em_qualquer_empresa() {
    let state = setup().await;
    let role = create_role(&state, "superadmin", true).await;
    let code = unique("manage_all");
    let permission = create_permission(&state, &code).await;
    let user = create_user(&state.db_pool).await;

    // Concessão global: company_id nulo
    state
        .rbac_service
        .grant_permission(role.id, permission.id, None)
        .await
        .unwrap();

    let c1 = create_company(&state, "C1").await;
    let c2 = create_company(&state, "C2").await;
    for company in [&c1, &c2] {
        state
            .company_service
            .add_member(AddMemberPayload {
                user_id: user,
                company_id: company.id,
                role_id: role.id,
                user_type: UserType::Owner,
            })
            .await
            .unwrap();
    }

    // Independente de qual empresa for passada, a resposta é true
    for company in [&c1, &c2] {
        let allowed = state
            .rbac_service
            .has_permission(user, company.id, &code)
            .await
            .unwrap();
        assert!(allowed);
    }
}

#[tokio::test]
async fn negado_e_false_nao_erro() {
    let state = setup().await;
    let company = create_company(&state, "C1").await;
    let role = create_role(&state, "leitor", false).await;
    let code = unique("edit_prices");
    let _permission = create_permission(&state, &code).await;
    let user = create_user(&state.db_pool).await;

    state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: company.id,
            role_id: role.id,
            user_type: UserType::Collaborator,
        })
        .await
        .unwrap();

    // Vínculo ativo existe, concessão não: negado, sem erro
    let allowed = state
        .rbac_service
        .has_permission(user, company.id, &code)
        .await
        .unwrap();
    assert!(!allowed);
}

#[tokio::test]
async fn permissao_inexistente_ou_inativa_e_erro() {
    let state = setup().await;
    let company = create_company(&state, "C1").await;
    let user = create_user(&state.db_pool).await;

    let err = state
        .rbac_service
        .has_permission(user, company.id, &unique("nao_existe"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionNotFound));

    // Permissão desativada conta como ausente
    let code = unique("desativada");
    let permission = create_permission(&state, &code).await;
    state
        .catalog_service
        .deactivate_permission(permission.id)
        .await
        .unwrap();

    let err = state
        .rbac_service
        .has_permission(user, company.id, &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionNotFound));
}

#[tokio::test]
async fn vinculo_inativo_nao_autoriza() {
    let state = setup().await;
    let company = create_company(&state, "C1").await;
    let role = create_role(&state, "gerente", false).await;
    let code = unique("edit_prices");
    let permission = create_permission(&state, &code).await;
    let user = create_user(&state.db_pool).await;

    state
        .rbac_service
        .grant_permission(role.id, permission.id, Some(company.id))
        .await
        .unwrap();
    let membership = state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: company.id,
            role_id: role.id,
            user_type: UserType::Collaborator,
        })
        .await
        .unwrap();

    state
        .company_service
        .deactivate_membership(membership.id)
        .await
        .unwrap();

    let err = state
        .rbac_service
        .has_permission(user, company.id, &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoActiveMembership));
}

// ---
// Transição de empresa padrão
// ---

#[tokio::test]
async fn primeiro_vinculo_nasce_como_padrao() {
    let state = setup().await;
    let role = create_role(&state, "gerente", false).await;
    let user = create_user(&state.db_pool).await;
    let c1 = create_company(&state, "C1").await;
    let c2 = create_company(&state, "C2").await;

    let m1 = state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: c1.id,
            role_id: role.id,
            user_type: UserType::Owner,
        })
        .await
        .unwrap();
    assert!(m1.is_default);

    let m2 = state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: c2.id,
            role_id: role.id,
            user_type: UserType::Collaborator,
        })
        .await
        .unwrap();
    assert!(!m2.is_default);

    assert_eq!(count_defaults(&state.db_pool, user).await, 1);
}

#[tokio::test]
async fn set_as_default_move_a_flag_atomicamente() {
    let state = setup().await;
    let role = create_role(&state, "gerente", false).await;
    let user = create_user(&state.db_pool).await;
    let c1 = create_company(&state, "C1").await;
    let c2 = create_company(&state, "C2").await;

    let m1 = state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: c1.id,
            role_id: role.id,
            user_type: UserType::Owner,
        })
        .await
        .unwrap();
    let m2 = state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: c2.id,
            role_id: role.id,
            user_type: UserType::Collaborator,
        })
        .await
        .unwrap();

    let updated = state.company_service.set_as_default(m2.id).await.unwrap();
    assert!(updated.is_default);

    let m1_after = state.company_service.get_membership(m1.id).await.unwrap();
    assert!(!m1_after.is_default);
    assert_eq!(count_defaults(&state.db_pool, user).await, 1);

    // Idempotente: repetir sobre a mesma linha mantém o invariante
    state.company_service.set_as_default(m2.id).await.unwrap();
    assert_eq!(count_defaults(&state.db_pool, user).await, 1);
}

#[tokio::test]
async fn set_as_default_com_alvo_inexistente_preserva_o_estado() {
    let state = setup().await;
    let role = create_role(&state, "gerente", false).await;
    let user = create_user(&state.db_pool).await;
    let c1 = create_company(&state, "C1").await;

    let m1 = state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: c1.id,
            role_id: role.id,
            user_type: UserType::Owner,
        })
        .await
        .unwrap();
    assert!(m1.is_default);

    // Falha no meio do protocolo: nada muda (tudo-ou-nada)
    let err = state
        .company_service
        .set_as_default(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UserCompanyNotFound));

    let m1_after = state.company_service.get_membership(m1.id).await.unwrap();
    assert!(m1_after.is_default);
    assert_eq!(count_defaults(&state.db_pool, user).await, 1);
}

#[tokio::test]
async fn chamadas_concorrentes_nunca_deixam_dois_padroes() {
    let state = setup().await;
    let role = create_role(&state, "gerente", false).await;
    let user = create_user(&state.db_pool).await;
    let c1 = create_company(&state, "C1").await;
    let c2 = create_company(&state, "C2").await;

    let m1 = state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: c1.id,
            role_id: role.id,
            user_type: UserType::Owner,
        })
        .await
        .unwrap();
    let m2 = state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: c2.id,
            role_id: role.id,
            user_type: UserType::Collaborator,
        })
        .await
        .unwrap();

    // Duas transições disputando o mesmo usuário, várias rodadas
    for _ in 0..10 {
        let s1 = state.company_service.clone();
        let s2 = state.company_service.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { s1.set_as_default(m1.id).await }),
            tokio::spawn(async move { s2.set_as_default(m2.id).await }),
        );
        a.unwrap().unwrap();
        b.unwrap().unwrap();

        // Em QUALQUER instante observado, no máximo um padrão
        assert_eq!(count_defaults(&state.db_pool, user).await, 1);
    }
}

#[tokio::test]
async fn desativar_vinculo_derruba_a_flag_de_padrao() {
    let state = setup().await;
    let role = create_role(&state, "gerente", false).await;
    let user = create_user(&state.db_pool).await;
    let c1 = create_company(&state, "C1").await;

    let m1 = state
        .company_service
        .add_member(AddMemberPayload {
            user_id: user,
            company_id: c1.id,
            role_id: role.id,
            user_type: UserType::Owner,
        })
        .await
        .unwrap();
    assert!(m1.is_default);

    state
        .company_service
        .deactivate_membership(m1.id)
        .await
        .unwrap();

    assert_eq!(count_defaults(&state.db_pool, user).await, 0);
    assert!(
        state
            .company_service
            .get_default_company(user)
            .await
            .unwrap()
            .is_none()
    );
}

// ---
// Catálogo
// ---

#[tokio::test]
async fn rota_completa_compoe_modulo_e_submodulo() {
    let state = setup().await;
    let module = state
        .catalog_service
        .create_module(CreateModulePayload {
            name: "Estoque".into(),
            code: unique("inventory"),
            route_path: Some("/inventory".into()),
        })
        .await
        .unwrap();
    let submodule = state
        .catalog_service
        .create_submodule(CreateSubmodulePayload {
            module_id: module.id,
            name: "Itens".into(),
            code: unique("items"),
            route_path: Some("/items".into()),
        })
        .await
        .unwrap();

    let route = state.catalog_service.full_route(submodule.id).await.unwrap();
    assert_eq!(route, "/inventory/items");
}

#[tokio::test]
async fn codigo_de_modulo_e_unico() {
    let state = setup().await;
    let code = unique("mod");
    let payload = || CreateModulePayload {
        name: "Estoque".into(),
        code: code.clone(),
        route_path: None,
    };

    state.catalog_service.create_module(payload()).await.unwrap();
    let err = state.catalog_service.create_module(payload()).await.unwrap_err();
    assert!(matches!(err, AppError::UniqueConstraintViolation(_)));
}

#[tokio::test]
async fn submodulo_exige_modulo_existente() {
    let state = setup().await;
    let err = state
        .catalog_service
        .create_submodule(CreateSubmodulePayload {
            module_id: Uuid::new_v4(),
            name: "Órfão".into(),
            code: unique("sub"),
            route_path: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ModuleNotFound));
}
