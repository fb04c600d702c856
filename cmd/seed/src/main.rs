//! Bootstraps a deployment: creates (or promotes) a superuser and optionally
//! seeds taxonomy entries, using the same settings as the server.

use anyhow::Context;
use clap::Parser;
use rr_config::Settings;
use rr_core::drafts::{validate_account, TaxonPayload};
use rr_core::models::{NewUser, Role, TaxonomyKind};
use rr_core::traits::{CatalogRepo, UserRepo};
use rr_db_sqlite::SqliteRepo;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "seed", about = "Create an administrator and starter taxonomy")]
struct Args {
    /// Username of the superuser
    #[arg(long)]
    username: String,

    /// Email of the superuser
    #[arg(long)]
    email: String,

    /// Category as `slug=Name`; repeatable
    #[arg(long = "category", value_name = "SLUG=NAME")]
    categories: Vec<String>,

    /// Genre as `slug=Name`; repeatable
    #[arg(long = "genre", value_name = "SLUG=NAME")]
    genres: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let settings = Settings::load().context("loading settings")?;
    let repo = SqliteRepo::connect(&settings.database.url, settings.database.max_connections).await?;

    seed_superuser(&repo, &args.username, &args.email).await?;
    for entry in &args.categories {
        seed_taxon(&repo, TaxonomyKind::Category, entry).await?;
    }
    for entry in &args.genres {
        seed_taxon(&repo, TaxonomyKind::Genre, entry).await?;
    }
    Ok(())
}

async fn seed_superuser(repo: &SqliteRepo, username: &str, email: &str) -> anyhow::Result<()> {
    if let Some(mut user) = repo.get_user_by_username(username).await? {
        user.role = Role::Admin;
        user.is_superuser = true;
        repo.update_user(&user).await?;
        info!(%username, "existing account promoted to superuser");
        return Ok(());
    }

    validate_account(username, email, "", "")?;

    let user = repo
        .create_user(NewUser { role: Role::Admin, is_superuser: true, ..NewUser::signup(username, email) })
        .await?;
    info!(user_id = user.id, %username, "superuser created");
    Ok(())
}

async fn seed_taxon(repo: &SqliteRepo, kind: TaxonomyKind, entry: &str) -> anyhow::Result<()> {
    let (slug, name) = entry
        .split_once('=')
        .with_context(|| format!("expected SLUG=NAME, got {:?}", entry))?;
    if repo.find_taxon(kind, slug).await?.is_some() {
        info!(kind = kind.entity_name(), %slug, "already present");
        return Ok(());
    }
    let draft = TaxonPayload { name: Some(name.into()), slug: Some(slug.into()) }.into_draft()?;
    repo.create_taxon(kind, &draft).await?;
    info!(kind = kind.entity_name(), %slug, "taxon created");
    Ok(())
}
