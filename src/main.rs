use anyhow::bail;
use clap::Parser;
use inquire::error::InquireResult;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod app;
mod artifacts;
mod auth;
mod cli;
mod config;
mod lock;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use app::{AppFactory, ArtifactInput};

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let paths = AppFactory::get_paths()?;
    let config = AppFactory::create_config(&paths)?;
    let app = AppFactory::create_app_service(&paths, &config)?;

    match args.command {
        cli::Command::Daemon { listen } => {
            let listen = listen.unwrap_or_else(|| config.server.listen.clone());
            let token = auth::WriteToken::new(AppFactory::parse_auth_token());
            web::start_daemon(app, &listen, token)
        }

        cli::Command::Add {
            url,
            title,
            content,
        } => {
            let artifact = app.create(ArtifactInput {
                url,
                title,
                content,
            })?;
            print_json(&artifact)
        }

        cli::Command::Edit {
            id,
            url,
            title,
            content,
        } => {
            let artifact = app.update(
                id,
                ArtifactInput {
                    url,
                    title,
                    content,
                },
            )?;
            print_json(&artifact)
        }

        cli::Command::Search { query, count } => {
            let results = app.search(&query)?;

            if count {
                println!("{} bookmarks found", results.len());
                return Ok(());
            }

            print_json(&results)
        }

        cli::Command::List {} => print_json(&app.list()?),

        cli::Command::Show { id } => print_json(&app.get(id)?),

        cli::Command::Delete { id, yes } => {
            let artifact = app.get(id)?;

            if !yes {
                match inquire::prompt_confirmation(format!(
                    "Are you sure you want to delete bookmark #{id} ({})?",
                    artifact.url
                )) {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                }
            }

            app.delete(id)?;
            println!("bookmark #{id} removed");
            Ok(())
        }
    }
}
