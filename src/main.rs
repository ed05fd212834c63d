//! Practice Notify CLI
//!
//! 律所业务系统的通知分发引擎：`dispatch` 消费数据层 change-capture
//! 推送的事件 JSON，`recent` / `prefs` 是运维辅助视图。

use std::io::Read;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use practice_notify::{Config, DispatchHandler, NotificationStore, PreferenceStore};

#[derive(Parser)]
#[command(name = "pnotify")]
#[command(about = "Practice Notify - 业务记录变更的通知分发引擎")]
#[command(version)]
struct Cli {
    /// 数据目录（默认 ~/.config/practice-notify）
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 处理一个变更事件（JSON body 默认从 stdin 读取）
    Dispatch {
        /// 从文件读取事件 JSON
        #[arg(long)]
        file: Option<PathBuf>,
        /// 只打印将要发生的投递，不写存储、不调服务商
        #[arg(long)]
        dry_run: bool,
    },
    /// 查看最近的通知
    Recent {
        /// 条数
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 查看某用户的有效偏好（含默认值）
    Prefs {
        /// 用户 id
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 控制日志级别，默认 info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("practice_notify=info,pnotify=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }

    match cli.command {
        Commands::Dispatch { file, dry_run } => {
            let body = match file {
                Some(path) => std::fs::read_to_string(&path)?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };

            let handler = DispatchHandler::new(&config.with_dry_run(dry_run));
            let response = handler.handle_json(&body).await;
            println!("{}", serde_json::to_string(&response)?);

            // 错误响应类对应非零退出码，交给上游重投
            if response.is_error() {
                std::process::exit(1);
            }
        }
        Commands::Recent { limit, json } => {
            let store = NotificationStore::new(&config.data_dir);
            let records = store.read_recent(limit);

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("没有通知记录");
            } else {
                for record in &records {
                    println!(
                        "[{}] {} -> {} ({}/{}) {}",
                        record.created_at.format("%Y-%m-%d %H:%M:%S"),
                        record.notification_type,
                        record.recipient_id,
                        record.delivery_status.as_str(),
                        record.priority,
                        record.title,
                    );
                }
            }
        }
        Commands::Prefs { user_id } => {
            let store = PreferenceStore::new(&config.data_dir);
            let prefs = store.load(&user_id);
            println!("{}", serde_json::to_string_pretty(&prefs)?);
        }
    }

    Ok(())
}
