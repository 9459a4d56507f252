use clap::Parser;
use clap::Subcommand;
use futures_util::pin_mut;
use futures_util::TryStreamExt;
use hostscout::CommandDispatcher;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Command::Discover { port, timeout_ms } => discover(port, timeout_ms).await?,
        Command::Get {
            host,
            port,
            path,
            params,
            timeout_ms,
        } => get(&host, port, &path, &params, timeout_ms).await?,
        Command::Post {
            host,
            port,
            path,
            body,
            content_type,
            timeout_ms,
        } => post(&host, port, &path, &body, &content_type, timeout_ms).await?,
    };
    Ok(())
}

async fn discover(port: u16, timeout_ms: u64) -> anyhow::Result<()> {
    log::info!("Listening for advertisements on port {} for {} ms", port, timeout_ms);
    let hosts = hostscout::discover(port, Duration::from_millis(timeout_ms));
    pin_mut!(hosts);
    while let Some(host) = hosts.try_next().await? {
        println!("{}\t{}", host.name, host.address);
    }
    Ok(())
}

async fn get(
    host: &str,
    port: u16,
    path: &str,
    params: &[String],
    timeout_ms: u64,
) -> anyhow::Result<()> {
    let params = params
        .iter()
        .map(|param| {
            param
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Parameter `{}` is not `key=value`", param))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let dispatcher = CommandDispatcher::new(Duration::from_millis(timeout_ms));
    let body = dispatcher.get_command(host, port, path, &params).await;
    println!("{}", body);
    Ok(())
}

async fn post(
    host: &str,
    port: u16,
    path: &str,
    body: &str,
    content_type: &str,
    timeout_ms: u64,
) -> anyhow::Result<()> {
    let dispatcher = CommandDispatcher::new(Duration::from_millis(timeout_ms));
    if dispatcher
        .post_command(host, port, path, body, content_type)
        .await
    {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Command rejected or host unreachable")
    }
}

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for advertising servers and print them as they are found.
    Discover {
        #[arg(long, default_value_t = hostscout::DEFAULT_LISTEN_PORT)]
        port: u16,
        #[arg(long, default_value_t = hostscout::DEFAULT_LISTEN_TIMEOUT.as_millis() as u64)]
        timeout_ms: u64,
    },
    /// Send a GET command and print the response body.
    Get {
        host: String,
        port: u16,
        path: String,
        /// Query parameters as `key=value`, encoded in the order given.
        params: Vec<String>,
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Send a POST command with a body.
    Post {
        host: String,
        port: u16,
        path: String,
        body: String,
        #[arg(long, default_value = "text/plain")]
        content_type: String,
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
}
