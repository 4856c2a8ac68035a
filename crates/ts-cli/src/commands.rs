use std::path::PathBuf;

use colored::Colorize;
use ts_protocol::HeaderFormat;
use ts_sdk::{get_post, GetOptions, Source};
use ts_server::{ServerConfig, TsServer};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Get(args) => cmd_get(args).await,
    }
}

fn server_config(args: ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(source) = args.source {
        config.source = source;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.opaque_ids {
        config.opaque_ids = true;
    }
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = server_config(args)?;
    tracing::debug!(?config, "server configuration");
    let store = Source::open(&config.source, &base_dir()?)?;
    println!(
        "{} Serving {} on {}",
        "✓".green().bold(),
        config.source.bold(),
        config.bind_addr.to_string().yellow()
    );
    TsServer::new(config, store).serve().await?;
    Ok(())
}

async fn cmd_get(args: GetArgs) -> anyhow::Result<()> {
    let format: HeaderFormat = args.format.parse()?;
    let options = GetOptions {
        format,
        headers: args.headers,
        headers_only: args.headers_only,
        before: None,
        id: args.id,
    }
    .with_before(args.before.as_deref())?;
    let store = Source::open(&args.url, &base_dir()?)?;
    let mut stdout = tokio::io::stdout();
    get_post(&store, &options, &mut stdout).await?;
    Ok(())
}

fn base_dir() -> anyhow::Result<PathBuf> {
    Ok(std::env::current_dir()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn serve_args(argv: &[&str]) -> ServeArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Serve(args) => args,
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts.toml");
        std::fs::write(&path, "source = \"/srv/posts\"\nbind_addr = \"0.0.0.0:9000\"\n").unwrap();
        let path = path.to_str().unwrap();

        let config = server_config(serve_args(&["timestreams", "serve", "--config", path])).unwrap();
        assert_eq!(config.source, "/srv/posts");
        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse().unwrap());

        let config = server_config(serve_args(&[
            "timestreams", "serve", "--config", path, "--source", "posts", "--opaque-ids",
        ]))
        .unwrap();
        assert_eq!(config.source, "posts");
        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse().unwrap());
        assert!(config.opaque_ids);
    }

    #[tokio::test]
    async fn unknown_format_fails_before_output() {
        let cli = Cli::try_parse_from(["timestreams", "get", "--format", "xml", "."]).unwrap();
        let err = run_command(cli).await.unwrap_err();
        assert!(err.to_string().contains("xml"), "{err}");
    }

    #[tokio::test]
    async fn unreadable_before_is_rejected() {
        let cli = Cli::try_parse_from(["timestreams", "get", "--before", "soon", "."]).unwrap();
        let err = run_command(cli).await.unwrap_err();
        assert!(err.to_string().contains("soon"), "{err}");
    }

    #[tokio::test]
    async fn unsupported_source_scheme() {
        let cli = Cli::try_parse_from(["timestreams", "get", "ftp://example.com/"]).unwrap();
        let err = run_command(cli).await.unwrap_err();
        assert!(err.to_string().contains("ftp:"), "{err}");
    }
}
