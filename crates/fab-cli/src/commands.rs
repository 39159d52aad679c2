use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use fab_sdk::{Document, Fab, Requester, View};
use fab_server::{FabServer, ServerConfig};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Syncdb => cmd_syncdb(&config),
        Command::Clear(args) => cmd_clear(&config, args),
        Command::Register(args) => cmd_register(&config, args, cli.format),
        Command::Put(args) => cmd_put(&config, args, cli.format),
        Command::Get(args) => cmd_get(&config, args, cli.format),
    }
}

fn open(config: &ServerConfig) -> anyhow::Result<Fab> {
    Fab::open(&config.fab_config()).context("opening stores")
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    println!(
        "{} fab server on {} (bucket: {})",
        "▶".green().bold(),
        config.bind_addr.to_string().bold(),
        config.bucket.cyan()
    );
    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    runtime.block_on(async move {
        let server = FabServer::new(config)?;
        server.serve().await
    })?;
    Ok(())
}

fn cmd_syncdb(config: &ServerConfig) -> anyhow::Result<()> {
    open(config)?.syncdb()?;
    println!("{} Tables created in {}", "✓".green().bold(), config.database_url.bold());
    Ok(())
}

fn cmd_clear(config: &ServerConfig, args: ClearArgs) -> anyhow::Result<()> {
    if !args.yes {
        anyhow::bail!(
            "refusing to drop every table in {} without --yes",
            config.database_url
        );
    }
    open(config)?.clear()?;
    println!("{} Sessions flushed and tables dropped", "✓".green().bold());
    Ok(())
}

fn cmd_register(config: &ServerConfig, args: RegisterArgs, format: OutputFormat) -> anyhow::Result<()> {
    let user = open(config)?.register(&args.username, &args.email, &args.password)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "username": user.username,
                "email": user.email,
                "created_at": user.created_at,
            })
        ),
        OutputFormat::Text => println!(
            "{} Registered {} <{}>",
            "✓".green().bold(),
            user.username.to_string().yellow(),
            user.email
        ),
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match file {
        Some(path) if path != Path::new("-") => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn cmd_put(config: &ServerConfig, args: PutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let data = read_input(args.file.as_deref())?;
    let fab = open(config)?;
    let requester = fab.authenticate_password(&args.owner, &args.password)?;
    let upserted = fab.publish(&requester, &args.owner, &args.slug, &data)?;

    match format {
        OutputFormat::Json => print_document(&upserted.document)?,
        OutputFormat::Text => {
            let verb = if upserted.created { "Created" } else { "Updated" };
            println!(
                "{} {} {} (revision {})",
                "✓".green().bold(),
                verb,
                upserted.document.path().yellow(),
                upserted.document.revision
            );
            println!("  Content: {}", upserted.document.content_key.short_hex().cyan());
        }
    }
    Ok(())
}

fn cmd_get(config: &ServerConfig, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let fab = open(config)?;
    let requester = match &args.password {
        Some(password) => fab.authenticate_password(&args.owner, password)?,
        None => Requester::Anonymous,
    };

    if args.info || format == OutputFormat::Json {
        let doc = fab.document(&requester, &args.owner, &args.slug)?;
        return match format {
            OutputFormat::Json => print_document(&doc),
            OutputFormat::Text => {
                println!("{}  {}", doc.path().yellow().bold(), doc.id.short_id().dimmed());
                println!("  Content:    {}", doc.content_key.to_hex().cyan());
                println!("  Revision:   {}", doc.revision);
                println!("  Visibility: {}", doc.visibility);
                if let Some(parent) = doc.forked_from {
                    println!("  Forked from {}", parent.to_string().blue());
                }
                println!("  Updated:    {}", doc.updated_at.to_rfc3339());
                Ok(())
            }
        };
    }

    let view = View::from(args.rendered);
    let body = fab.read(&requester, &args.owner, &args.slug, view)?;
    std::io::stdout().write_all(&body)?;
    Ok(())
}

fn print_document(doc: &Document) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(doc)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fab_db::Database;
    use fab_sdk::{ErrorKind, SdkError, Visibility};

    fn config(dir: &Path) -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            bucket: "docs".into(),
            blob_root: dir.join("blobs"),
            database_url: dir.join("fab.db").display().to_string(),
            session_url: dir.join("sessions.db").display().to_string(),
            max_blob_size: 1024,
            session_ttl_secs: 60,
        }
    }

    fn with_alice(dir: &Path) -> ServerConfig {
        let config = config(dir);
        cmd_syncdb(&config).unwrap();
        let register = RegisterArgs {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "s3cret".into(),
        };
        cmd_register(&config, register, OutputFormat::Text).unwrap();
        config
    }

    fn put(config: &ServerConfig, dir: &Path, password: &str) -> anyhow::Result<()> {
        let file = dir.join("notes.md");
        std::fs::write(&file, "# Hello").unwrap();
        let args = PutArgs {
            owner: "alice".into(),
            slug: "notes".into(),
            file: Some(file),
            password: password.into(),
        };
        cmd_put(config, args, OutputFormat::Text)
    }

    fn get_info(config: &ServerConfig, password: Option<&str>) -> anyhow::Result<()> {
        let args = GetArgs {
            owner: "alice".into(),
            slug: "notes".into(),
            rendered: false,
            info: true,
            password: password.map(String::from),
        };
        cmd_get(config, args, OutputFormat::Text)
    }

    fn stored_sessions(config: &ServerConfig) -> i64 {
        Database::open(&config.session_url)
            .unwrap()
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?))
            .unwrap()
    }

    fn kind(err: anyhow::Error) -> ErrorKind {
        err.downcast::<SdkError>().expect("an sdk error").kind()
    }

    #[test]
    fn put_publishes_without_leaving_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = with_alice(dir.path());

        put(&config, dir.path(), "s3cret").unwrap();
        put(&config, dir.path(), "s3cret").unwrap();

        let doc = open(&config)
            .unwrap()
            .document(&Requester::Anonymous, "alice", "notes")
            .unwrap();
        assert_eq!(doc.revision, 2);
        assert_eq!(stored_sessions(&config), 0);
    }

    #[test]
    fn put_with_wrong_password_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = with_alice(dir.path());

        let err = put(&config, dir.path(), "wrong").unwrap_err();
        assert_eq!(kind(err), ErrorKind::AuthFailed);
        assert_eq!(stored_sessions(&config), 0);
    }

    #[test]
    fn owner_reads_private_document_with_password() {
        let dir = tempfile::tempdir().unwrap();
        let config = with_alice(dir.path());
        put(&config, dir.path(), "s3cret").unwrap();

        let fab = open(&config).unwrap();
        let alice = fab.authenticate_password("alice", "s3cret").unwrap();
        fab.set_visibility(&alice, "alice", "notes", Visibility::Private)
            .unwrap();
        drop(fab);

        assert_eq!(kind(get_info(&config, None).unwrap_err()), ErrorKind::PermissionDenied);
        assert_eq!(kind(get_info(&config, Some("wrong")).unwrap_err()), ErrorKind::AuthFailed);
        get_info(&config, Some("s3cret")).unwrap();
    }

    #[test]
    fn clear_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let config = with_alice(dir.path());

        assert!(cmd_clear(&config, ClearArgs { yes: false }).is_err());
        put(&config, dir.path(), "s3cret").unwrap();

        cmd_clear(&config, ClearArgs { yes: true }).unwrap();
        assert!(Database::open(&config.database_url).unwrap().tables().unwrap().is_empty());
    }
}
