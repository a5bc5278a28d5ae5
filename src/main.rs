use clap::{Parser, Subcommand};
use simplelog::{CombinedLogger, Config, LevelFilter, TermLogger};
use std::{path::PathBuf, time::Duration};
use ssdeploy::{
    config::Settings,
    document::build_server_config,
    lookup::HttpFetcher,
    prompt::{self, derive_params},
    provision::{self, Options},
    system::{
        host::{require_root, OS_RELEASE},
        SystemRunner,
    },
    uri::{encode_uri, ShareLink},
};

#[derive(Debug, Parser)]
#[command(version, about = "Provision a sing-box Shadowsocks relay")]
struct Command {
    #[arg(short, long, value_name = "FILE", global = true)]
    settings: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", default_value = "info", global = true, value_parser = parse_level)]
    log_level: LevelFilter,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Install sing-box, write the config and service, open the firewall
    Install {
        #[arg(long)]
        skip_service: bool,

        #[arg(long)]
        skip_firewall: bool,
    },
    /// Only derive the config and print the share link
    Config {
        #[arg(short, long, value_name = "FILE", default_value = "./config.json")]
        output: PathBuf,
    },
    /// Print the fields of an ss:// link
    Decode { uri: String },
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse().map_err(|_| format!("unknown log level {s:?}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_install_flags() {
        let cmd = Command::try_parse_from(["ssdeploy", "install", "--skip-firewall", "-s", "/tmp/s.toml"]).unwrap();
        assert_eq!(cmd.settings, Some(PathBuf::from("/tmp/s.toml")));
        assert_eq!(cmd.log_level, LevelFilter::Info);
        assert!(matches!(
            cmd.action,
            Action::Install {
                skip_service: false,
                skip_firewall: true
            }
        ));
    }

    #[test]
    fn parse_config_defaults() {
        let cmd = Command::try_parse_from(["ssdeploy", "--log-level", "debug", "config"]).unwrap();
        assert_eq!(cmd.log_level, LevelFilter::Debug);
        match cmd.action {
            Action::Config { output } => assert_eq!(output, PathBuf::from("./config.json")),
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Command::try_parse_from(["ssdeploy"]).is_err());
        assert!(Command::try_parse_from(["ssdeploy", "--log-level", "loud", "config"]).is_err());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cmd = Command::parse();

    if let Err(err) = log_init(cmd.log_level) {
        eprintln!("logger init failed: {err}");
    }

    if let Err(err) = run(cmd).await {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn log_init(level: LevelFilter) -> anyhow::Result<()> {
    CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )])?;
    Ok(())
}

async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd.action {
        Action::Decode { uri } => decode(&uri),
        Action::Config { output } => {
            let settings = Settings::load_or_default(cmd.settings.as_deref()).await?;
            let fetch = HttpFetcher::new(Duration::from_secs(settings.lookup.timeout_secs))?;
            let mut prompter = prompt::stdio();
            let params = derive_params(&mut prompter, &settings.answers, &fetch, &settings.lookup.ip_endpoints).await?;
            build_server_config(&params).write_to(&output).await?;
            println!("{}", encode_uri(&params));
            Ok(())
        }
        Action::Install {
            skip_service,
            skip_firewall,
        } => {
            require_root()?;
            let settings = Settings::load_or_default(cmd.settings.as_deref()).await?;
            let fetch = HttpFetcher::new(Duration::from_secs(settings.lookup.timeout_secs))?;
            let runner = SystemRunner::new();

            provision::prepare_host(&settings, &runner, &fetch, OS_RELEASE).await?;

            let mut prompter = prompt::stdio();
            let options = Options {
                skip_service,
                skip_firewall,
            };
            let outcome = provision::configure(&settings, &runner, &fetch, &mut prompter, options).await?;
            log::info!("relay is ready on {}:{}", outcome.params.server_address, outcome.params.port);
            println!("{}", outcome.uri);
            Ok(())
        }
    }
}

fn decode(uri: &str) -> anyhow::Result<()> {
    let link = ShareLink::parse(uri)?;
    println!("method:   {}", link.method);
    println!("password: {}", link.password);
    println!("server:   {}", link.host);
    println!("port:     {}", link.port);
    match link.obfs {
        Some(obfs) => println!("obfs:     {} ({})", obfs.mode, obfs.host),
        None => println!("obfs:     none"),
    }
    if let Some(name) = link.name {
        println!("name:     {name}");
    }
    Ok(())
}
