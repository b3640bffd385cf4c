use anyhow::{bail, Context, Result};
use clap::Parser;
use lir_common::prompt::{setup_logger, LoggerOptions};
use lir_wallet::{
    config::Config,
    connection::ChainConnection,
    contract::WriteCall,
    provider::HttpProvider,
    session::SessionController,
};
use log::{debug, info};
use std::{fs::File, io::Write, path::Path, str::FromStr, sync::Arc, time::Duration};

// Command given with --exec
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Status,
    Watch(u64),
    Write(WriteCall),
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let args: Vec<&str> = s.split_whitespace().collect();
        let command = match args.as_slice() {
            ["status"] => Self::Status,
            ["watch", seconds] => Self::Watch(seconds.parse().context("Invalid number of seconds")?),
            ["set-manager", manager, status] => Self::Write(WriteCall::SetManager {
                manager: manager.to_string(),
                status: status.parse().context("Status must be true or false")?,
            }),
            ["distribute", manager, amount] => Self::Write(WriteCall::DistributeToManager {
                manager: manager.to_string(),
                amount: amount.to_string(),
            }),
            ["reward", student, amount] => Self::Write(WriteCall::RewardStudent {
                student: student.to_string(),
                amount: amount.to_string(),
            }),
            ["burn", amount] => Self::Write(WriteCall::BurnTokens {
                amount: amount.to_string(),
            }),
            _ => bail!("Unknown command '{}', see --help for the available commands", s),
        };

        Ok(command)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config: Config = Config::parse();
    if let Some(path) = config.config_file.as_ref() {
        if config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {}", path);
                return Ok(());
            }

            let mut file = File::create(path).context("Error while creating config file")?;
            let json = serde_json::to_string_pretty(&config).context("Error while serializing config file")?;
            file.write_all(json.as_bytes()).context("Error while writing config file")?;
            println!("Config file template generated at {}", path);
            return Ok(());
        }

        let file = File::open(path).context("Error while opening config file")?;
        config = serde_json::from_reader(file).context("Error while reading config file")?;
    } else if config.generate_config_template {
        eprintln!("Provided config file path is required to generate the template with --config-file");
        return Ok(());
    }

    let log_config = &config.log;
    setup_logger(LoggerOptions {
        level: log_config.log_level,
        file_level: log_config.file_log_level.unwrap_or(log_config.log_level),
        logs_path: &log_config.logs_path,
        filename_log: &log_config.filename_log,
        disable_file_logging: log_config.disable_file_logging,
        disable_file_log_date_based: log_config.disable_file_log_date_based,
        disable_log_color: log_config.disable_log_color,
        datetime_format: &log_config.datetime_format,
    })
    .context("Error while initializing the logger")?;

    let command: Command = config.exec.as_deref().unwrap_or("status").parse()?;
    if log::log_enabled!(log::Level::Debug) {
        debug!("command: {:?}", command);
    }

    let network = &config.network;
    let provider = HttpProvider::new(&network.rpc_address, Duration::from_millis(network.log_poll_interval_ms))?;
    let chain_id = provider
        .chain_id()
        .await
        .with_context(|| format!("Error while connecting to {}", network.rpc_address))?;
    info!("Connected to {} (chain id {})", provider.url(), chain_id);

    let controller = SessionController::new(
        ChainConnection::with_provider(Arc::new(provider)),
        network.session_config(),
    );
    if !controller.auto_connect().await? {
        controller.connect().await?;
    }

    match command {
        Command::Status => {}
        Command::Watch(seconds) => {
            info!("Watching transfers for {} seconds", seconds);
            tokio::time::sleep(Duration::from_secs(seconds)).await;
        }
        Command::Write(call) => {
            controller
                .submit(call)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
        }
    }

    let snapshot = controller.snapshot().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("Error while serializing the session")?
    );

    controller.disconnect().await;
    Ok(())
}
