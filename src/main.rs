use anyhow::Context;
use chrono::Local;
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use agriscale::access::{IdentityProvider, StaticTokenProvider};
use agriscale::app_service::AgriServices;
use agriscale::app_state::{AppEvent, SessionState};
use agriscale::commands::{self, AppCommand};
use agriscale::config::AppConfig;
use agriscale::storage;

fn init_logging(log_dir: &Path) -> anyhow::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("无法创建日志目录 {}", log_dir.display()))?;
    let log_path = log_dir.join(format!("agriscale-{}.log", ts));
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("无法创建日志文件 {}", log_path.display()))?;
    env_logger::Builder::new()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Warn)
        .filter_module("agriscale", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error)
        .parse_default_env() // RUST_LOG 覆盖以上默认值
        .init();
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv::dotenv().is_ok();
    let config = AppConfig::from_env();
    init_logging(&config.log_dir)?;
    if !env_loaded {
        warn!("未找到 .env 文件，使用系统环境变量");
    }

    let db = storage::establish_connection(&config.database_url)
        .await
        .with_context(|| format!("数据库连接失败: {}", config.database_url))?;
    let services = Arc::new(AgriServices::new(Arc::new(db)));

    let identity: Arc<dyn IdentityProvider> = match config.tokens.as_deref() {
        Some(table) => Arc::new(StaticTokenProvider::from_table(table).context("AGRI_TOKENS 格式错误")?),
        None => Arc::new(StaticTokenProvider::with_defaults()),
    };
    info!("Console started with database {}", config.database_url);

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<AppEvent>();

    // 单后台任务模型 (Actor)：worker 持有服务与会话
    let worker = tokio::spawn(commands::serve(
        services,
        identity,
        SessionState::default(),
        cmd_rx,
        evt_tx,
    ));
    let printer = tokio::spawn(async move {
        while let Some(evt) = evt_rx.recv().await {
            match &evt {
                AppEvent::Error { .. } => eprintln!("{}", evt.render()),
                _ => println!("{}", evt.render()),
            }
        }
    });

    println!("AgriScale 控制台，输入 help 查看命令");
    if let Some(token) = config.access_token.clone() {
        let _ = cmd_tx.send(AppCommand::Login { token });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("读取标准输入失败")? {
        let cmd = match line.parse::<AppCommand>() {
            Ok(cmd) => cmd,
            Err(()) => continue,
        };
        let quit = cmd == AppCommand::Quit;
        if cmd_tx.send(cmd).is_err() || quit {
            break;
        }
    }
    // 标准输入结束时也让 worker 正常退出
    let _ = cmd_tx.send(AppCommand::Quit);
    drop(cmd_tx);

    worker.await.context("命令 worker 异常退出")?;
    printer.await.context("输出任务异常退出")?;
    Ok(())
}
