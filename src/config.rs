// src/config.rs

use std::{env, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::db::{CatalogRepository, CompanyRepository, RbacRepository};
use crate::services::{CatalogService, CompanyService, RbacService};

// O estado compartilhado que a camada HTTP (fora deste crate) consome.
// Repositórios e serviços são montados UMA vez aqui e passados adiante —
// injeção de dependência explícita, sem registro global de modelos.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub catalog_service: CatalogService,
    pub rbac_service: RbacService,
    pub company_service: CompanyService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        tracing_subscriber::fmt().with_target(false).compact().init();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool))
    }

    /// Monta o gráfico de dependências sobre uma pool já criada
    /// (os testes de integração entram por aqui).
    pub fn with_pool(db_pool: PgPool) -> Self {
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let company_repo = CompanyRepository::new(db_pool.clone());

        let catalog_service = CatalogService::new(catalog_repo.clone(), db_pool.clone());
        let rbac_service = RbacService::new(
            rbac_repo,
            catalog_repo,
            company_repo.clone(),
            db_pool.clone(),
        );
        let company_service = CompanyService::new(company_repo, db_pool.clone());

        Self {
            db_pool,
            catalog_service,
            rbac_service,
            company_service,
        }
    }
}

/// Roda as migrações embutidas (FKs, CHECKs e o índice parcial único que
/// garante "no máximo uma empresa padrão por usuário" no próprio banco).
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!().run(pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    Ok(())
}
