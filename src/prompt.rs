use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use crate::config::Answers;
use crate::lookup::{detect_public_ip, Fetch};
use crate::params::{
    generate_password, select_method, select_obfuscation, validate_node_name, validate_port,
    validate_server_address, Method, Obfs, ObfsMode, ServerParams, DEFAULT_NODE_NAME,
    DEFAULT_OBFS_HOST, METHOD_MENU, OBFS_MENU,
};

pub struct Prompter<R, W> {
    reader: R,
    writer: W,
}

pub fn stdio() -> Prompter<BufReader<Stdin>, Stdout> {
    Prompter::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
}

impl<R, W> Prompter<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub async fn say(&mut self, text: &str) -> anyhow::Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads one trimmed line. End of input reads as an empty answer.
    pub async fn ask(&mut self, question: &str, default: Option<&str>) -> anyhow::Result<String> {
        let line = match default {
            Some(default) => format!("{question} [{default}]: "),
            None => format!("{question}: "),
        };
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        let mut answer = String::new();
        self.reader.read_line(&mut answer).await?;
        Ok(answer.trim().to_string())
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// Builds the run's [`ServerParams`]: pre-seeded answers first, then the
/// prompts, then the generated password. The server address is detected
/// through `fetch` and only asked for when every endpoint fails.
pub async fn derive_params<R, W>(
    prompter: &mut Prompter<R, W>,
    answers: &Answers,
    fetch: &dyn Fetch,
    ip_endpoints: &[String],
) -> anyhow::Result<ServerParams>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let port = match answers.port {
        Some(port) => validate_port(&port.to_string())?,
        None => validate_port(&prompter.ask("Port (1-65535)", None).await?)?,
    };

    let method = match answers.method {
        Some(ref method) => method.parse::<Method>()?,
        None => {
            prompter.say("Cipher method:").await?;
            prompter.say(METHOD_MENU).await?;
            select_method(&prompter.ask("Choice", Some("1")).await?).value
        }
    };

    let obfs = match answers.obfs {
        Some(ref mode) => match ObfsMode::parse_setting(mode)? {
            Some(mode) => Some(Obfs::new(mode, &obfs_host(prompter, answers).await?)),
            None => None,
        },
        None => {
            prompter.say("Obfuscation:").await?;
            prompter.say(OBFS_MENU).await?;
            let choice = prompter.ask("Choice", Some("2")).await?;
            match select_obfuscation(&choice, DEFAULT_OBFS_HOST).value {
                Some(obfs) => Some(Obfs::new(obfs.mode, &obfs_host(prompter, answers).await?)),
                None => None,
            }
        }
    };

    let node_name = match answers.node_name {
        Some(ref name) => validate_node_name(name),
        None => validate_node_name(&prompter.ask("Node name", Some(DEFAULT_NODE_NAME)).await?),
    };

    let server_address = match answers.server_address {
        Some(ref address) => validate_server_address(address)?,
        None => match detect_public_ip(fetch, ip_endpoints).await {
            Some(ip) => ip.to_string(),
            None => {
                log::warn!("could not detect the public address");
                let address = prompter.ask("Server address", None).await?;
                validate_server_address(&address)?
            }
        },
    };

    if method.needs_raw_key() {
        log::warn!("{method} expects a 16 or 32 byte base64 key; the generated password decodes to 12 bytes");
    }

    let params = ServerParams {
        port,
        password: generate_password(),
        method,
        obfs,
        server_address,
        node_name,
    };
    log::info!(
        "derived {}:{} method={} obfs={}",
        params.server_address,
        params.port,
        params.method,
        params.obfs.as_ref().map(|o| o.mode.as_str()).unwrap_or("none")
    );
    Ok(params)
}

async fn obfs_host<R, W>(prompter: &mut Prompter<R, W>, answers: &Answers) -> anyhow::Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match answers.obfs_host {
        Some(ref host) => Ok(host.clone()),
        None => prompter.ask("Obfuscation host", Some(DEFAULT_OBFS_HOST)).await,
    }
}
