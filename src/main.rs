use log::{error, info};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use recipe_catalog::config::load_config_from;
use recipe_catalog::providers::OpenAIProvider;
use recipe_catalog::{server, CatalogConfig, RecipeImporter, RecipeStore};

const USAGE: &str = "Usage: recipe-catalog [--config <file>] [serve | import <url>...]";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config_path, args) = match split_config_flag(env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };
    let loaded = match &config_path {
        Some(path) => load_config_from(path),
        None => CatalogConfig::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.first().map(String::as_str) {
        None | Some("serve") => match server::serve(&config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Server stopped: {}", e);
                ExitCode::FAILURE
            }
        },
        Some("import") if args.len() > 1 => import(&config, &args[1..]).await,
        _ => {
            eprintln!("{USAGE}");
            ExitCode::FAILURE
        }
    }
}

/// Pulls `--config <file>` (or `--config=<file>`) out of the arguments.
fn split_config_flag(args: impl Iterator<Item = String>) -> Result<(Option<PathBuf>, Vec<String>), String> {
    let mut config = None;
    let mut rest = Vec::new();
    let mut args = args;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args.next().ok_or("--config needs a file path")?;
            config = Some(PathBuf::from(path));
        } else if let Some(path) = arg.strip_prefix("--config=") {
            config = Some(PathBuf::from(path));
        } else {
            rest.push(arg);
        }
    }
    Ok((config, rest))
}

/// Imports each URL in turn; one failure does not stop the others.
async fn import(config: &CatalogConfig, urls: &[String]) -> ExitCode {
    let provider = match OpenAIProvider::new(&config.openai) {
        Ok(provider) => provider,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let store = RecipeStore::new(&config.data_dir);
    if let Err(e) = std::fs::create_dir_all(store.data_dir()) {
        error!("Cannot create {}: {}", store.data_dir().display(), e);
        return ExitCode::FAILURE;
    }
    let importer = match RecipeImporter::new(store, Arc::new(provider), &config.import) {
        Ok(importer) => importer,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut failures = 0;
    for url in urls {
        match importer.import(url).await {
            Ok(summary) => {
                info!("{} -> {}", url, summary.path.display());
                println!("{}", summary.slug);
            }
            Err(e) => {
                error!("{}: {}", url, e);
                failures += 1;
            }
        }
    }

    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|a| a.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_split_config_flag() {
        let (config, rest) = split_config_flag(args(&["--config", "prod.toml", "serve"])).unwrap();
        assert_eq!(config, Some(PathBuf::from("prod.toml")));
        assert_eq!(rest, vec!["serve"]);

        let (config, rest) = split_config_flag(args(&["import", "--config=a.toml", "https://x.test"])).unwrap();
        assert_eq!(config, Some(PathBuf::from("a.toml")));
        assert_eq!(rest, vec!["import", "https://x.test"]);

        let (config, rest) = split_config_flag(args(&[])).unwrap();
        assert_eq!(config, None);
        assert!(rest.is_empty());

        assert!(split_config_flag(args(&["serve", "--config"])).is_err());
    }
}
