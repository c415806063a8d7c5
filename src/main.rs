use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod admin;
mod check;
mod config;
mod error;
mod init;
mod media;
mod public;
mod repository;
mod section;
mod sections;
mod state;
mod store;

#[derive(Parser)]
#[command(name = "causeway", about = "公益机构站点内容服务：分区编辑、实时预览与公开页面", version = long_version())]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动后台管理与公开站点服务
    Serve {
        /// 项目根目录（默认当前目录）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// 监听地址
        #[arg(long)]
        host: Option<String>,

        /// 监听端口
        #[arg(long)]
        port: Option<u16>,
    },

    /// 检查配置和内容存储是否可用
    Check {
        /// 项目根目录（默认当前目录）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// 把尚未保存的分区写入默认内容
    Seed {
        /// 项目根目录（默认当前目录）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// 覆盖已保存的分区
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // None 等同于 Serve { root: ".", host: None, port: None }
    let command = cli.command.unwrap_or(Commands::Serve {
        root: PathBuf::from("."),
        host: None,
        port: None,
    });

    // 使用配置中的日志级别作为默认值，RUST_LOG 优先
    let default_level = match &command {
        Commands::Serve { root, .. } | Commands::Check { root } | Commands::Seed { root, .. } => {
            config::SiteConfig::load(&root.canonicalize().unwrap_or_else(|_| root.clone()))
                .ok()
                .map(|c| c.server.log_level.clone())
        }
    };

    let default_level = default_level.as_deref().unwrap_or("info");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match command {
        Commands::Serve { root, host, port } => {
            let root = root.canonicalize()?;
            if init::ensure_initialized(&root)? {
                tracing::info!("已自动初始化项目");
            }
            let site_config = config::SiteConfig::load(&root)?;

            let host = host.unwrap_or_else(|| site_config.server.host.clone());
            let port = port.unwrap_or(site_config.server.port);

            runtime.block_on(async move { run_server(root, site_config, &host, port).await })?;
        }
        Commands::Check { root } => {
            let root = root.canonicalize()?;
            let result = runtime.block_on(check::run(&root))?;

            for w in &result.warnings {
                tracing::warn!("{w}");
            }
            for e in &result.errors {
                tracing::error!("{e}");
            }

            if result.errors.is_empty() {
                tracing::info!("检查通过（{} 个警告）", result.warnings.len());
            } else {
                anyhow::bail!(
                    "检查未通过：{} 个错误，{} 个警告",
                    result.errors.len(),
                    result.warnings.len()
                );
            }
        }
        Commands::Seed { root, force } => {
            let root = root.canonicalize()?;
            if init::ensure_initialized(&root)? {
                tracing::info!("已自动初始化项目");
            }
            let site_config = config::SiteConfig::load(&root)?;
            let written = runtime.block_on(seed(&root, &site_config, force))?;
            tracing::info!("已写入 {written} 个分区的默认内容");
        }
    }

    Ok(())
}

async fn run_server(
    root: PathBuf,
    site_config: config::SiteConfig,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let app_state = state::AppState::new(root, site_config).await?;
    let app = admin::router(app_state);

    let addr = format!("{host}:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            tracing::error!("端口 {port} 已被占用，可用 --port 或 [server] port 指定其他端口");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!("服务启动：后台 http://{addr}/admin ，站点 http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}

/// 把缺失的分区写入默认内容；`force` 时覆盖全部分区（仅本地存储）
async fn seed(root: &std::path::Path, site_config: &config::SiteConfig, force: bool) -> anyhow::Result<usize> {
    use section::SectionKey;
    use store::SectionStore;

    let pool = state::open_database(root, site_config).await?;
    let store = store::ContentStore::from_config(&site_config.store, pool)?;
    if force && store.as_local().is_none() {
        anyhow::bail!("--force 只支持本地存储");
    }

    let mut written = 0;
    for key in SectionKey::ALL {
        let data = section::registry::default_data(key);
        let stored = if force {
            match store.as_local() {
                Some(local) => Some(local.overwrite(key, &data).await?),
                None => None,
            }
        } else {
            match store.fetch_section(key).await? {
                Some(existing) => {
                    tracing::debug!("分区 {key} 已存在（版本 {}），跳过", existing.version);
                    None
                }
                None => Some(store.save_section(key, &data, None).await?),
            }
        };
        if let Some(stored) = stored {
            tracing::info!("分区 {key} 已写入默认内容（版本 {}）", stored.version);
            written += 1;
        }
    }
    Ok(written)
}

const fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\ncommit:  ",
        env!("CAUSEWAY_GIT_COMMIT"),
        "\nbuild:   ",
        env!("CAUSEWAY_BUILD_TIME"),
        "\ntarget:  ",
        env!("CAUSEWAY_BUILD_TARGET"),
        "\nprofile: ",
        env!("CAUSEWAY_BUILD_PROFILE"),
    )
}
