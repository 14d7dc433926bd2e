//! # AI Admin 命令行
//!
//! 数据库迁移、种子数据、用量汇总、服务商端点与模型同步、邮件模板、公告和密钥管理

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use ai_admin::{
    AdminError,
    announcement::AnnouncementService,
    config::{ConfigCrypto, ConfigManager},
    database, lerror, linfo,
    logging::{self, LogComponent, LogStage},
    mail::{MailTemplateService, PlaceholderContext, Recipient, available_placeholders},
    provider::{
        EndpointResolver, HttpModelSource, ModelCatalogService, ProviderService,
        ProviderStatusService,
    },
    usage::{UsageAggregationService, UsageDashboardService},
};
use anyhow::Context as _;
use chrono::{NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use sea_orm::{ActiveEnum, DatabaseConnection};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "ai-admin", version, about = "AI 平台管理后台命令行")]
struct Cli {
    /// 配置文件路径，默认读取 config/config.{RUST_ENV}.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 日志级别，`RUST_LOG` 优先
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 执行数据库迁移
    Migrate,
    /// 写入默认 API 格式和邮件模板
    Seed,
    /// 用量汇总与仪表盘
    Usage {
        #[command(subcommand)]
        command: UsageCommand,
    },
    /// 服务商端点、状态与模型同步
    Provider {
        #[command(subcommand)]
        command: ProviderCommand,
    },
    /// 邮件模板
    Mail {
        #[command(subcommand)]
        command: MailCommand,
    },
    /// 公告
    Announcement {
        #[command(subcommand)]
        command: AnnouncementCommand,
    },
    /// 加密密钥
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },
}

#[derive(Debug, Subcommand)]
enum UsageCommand {
    /// 汇总每日用量，默认汇总昨天
    #[command(group(ArgGroup::new("range").args(["date", "from", "yesterday", "backfill"])))]
    Aggregate {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
        #[arg(long)]
        yesterday: bool,
        /// 回填最近 N 天
        #[arg(long)]
        backfill: Option<u64>,
    },
    /// 无用户归属的用量记录
    Orphaned {
        /// 删除这些记录
        #[arg(long)]
        delete: bool,
    },
    /// 以 JSON 输出仪表盘
    Dashboard {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Debug, Subcommand)]
enum ProviderCommand {
    /// 列出全部服务商
    List,
    /// 解析端点地址
    Resolve { unique_name: String, endpoint: String },
    /// 配置状态
    Status { unique_name: String },
    /// 测试连通性
    Test { unique_name: String },
    /// 拉取并同步模型
    Sync { unique_name: String },
}

#[derive(Debug, Subcommand)]
enum MailCommand {
    /// 列出模板
    List,
    /// 使用给定数据渲染模板
    Render {
        template_type: String,
        #[arg(long)]
        language: Option<String>,
        /// key=value，可重复
        #[arg(long = "data", value_parser = parse_key_value)]
        data: Vec<(String, String)>,
    },
    /// 使用预览数据渲染模板
    Preview {
        template_type: String,
        #[arg(long)]
        language: Option<String>,
        /// 收件人名称，缺省为访客
        #[arg(long, requires = "email")]
        name: Option<String>,
        #[arg(long, requires = "name")]
        email: Option<String>,
    },
    /// 模板可用的占位符
    Placeholders { template_type: String },
}

#[derive(Debug, Subcommand)]
enum AnnouncementCommand {
    /// 列出全部公告
    List,
    /// 当前生效的已发布公告
    Active {
        /// 用户角色，逗号分隔；缺省时只显示全局公告
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,
    },
    /// 发布公告
    Publish { id: i32 },
    /// 取消发布
    Unpublish { id: i32 },
    /// 输出公告正文
    Render {
        id: i32,
        #[arg(long, default_value = "en_US")]
        locale: String,
    },
}

#[derive(Debug, Subcommand)]
enum KeysCommand {
    /// 生成新的加密密钥
    Generate,
    /// 加密保存服务商密钥，空串表示清除
    Set { unique_name: String, api_key: String },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("参数格式应为 key=value: {raw}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let (message, code) = err.downcast_ref::<AdminError>().map_or_else(
                || (format!("{err:#}"), 1),
                |admin| (admin.user_message(), admin.category().exit_code()),
            );
            lerror!(
                "system",
                LogStage::Error,
                LogComponent::Main,
                "command_failed",
                &format!("命令执行失败: {err:#}")
            );
            eprintln!("error: {message}");
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::Keys {
        command: KeysCommand::Generate,
    } = cli.command
    {
        println!("{}", ConfigCrypto::generate_key());
        return Ok(());
    }

    let manager = match cli.config.as_deref() {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::load()?,
    };
    manager.install_crypto()?;
    let config = manager.config();

    let db = database::init_database(&config.database).await?;
    database::run_migrations(&db).await?;

    match cli.command {
        Command::Migrate => {
            let pending = database::check_database_status(&db).await?;
            println!("迁移完成，待应用迁移 {pending} 个");
        }
        Command::Seed => {
            let report = database::ensure_default_data(&db).await?;
            println!(
                "新增 API 格式 {}，端点 {}，邮件模板 {}",
                report.api_formats, report.endpoints, report.mail_templates
            );
        }
        Command::Usage { command } => {
            run_usage(&db, command, config.usage.dashboard_top_n).await?;
        }
        Command::Provider { command } => run_provider(&db, command).await?,
        Command::Mail { command } => run_mail(&db, command, &manager).await?,
        Command::Announcement { command } => run_announcement(&db, command).await?,
        Command::Keys { command } => match command {
            KeysCommand::Generate => println!("{}", ConfigCrypto::generate_key()),
            KeysCommand::Set {
                unique_name,
                api_key,
            } => {
                let providers = ProviderService::new(&db);
                let provider = providers.get_by_unique_name(&unique_name).await?;
                let updated = providers.set_api_key(provider, &api_key).await?;
                println!(
                    "{}: {}",
                    updated.unique_name,
                    if updated.has_api_key() {
                        "密钥已保存"
                    } else {
                        "密钥已清除"
                    }
                );
            }
        },
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "command_complete",
        "命令执行完成"
    );
    Ok(())
}

async fn run_usage(
    db: &DatabaseConnection,
    command: UsageCommand,
    top_n: usize,
) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();
    let aggregation = UsageAggregationService::new(db);

    match command {
        UsageCommand::Aggregate {
            date,
            from,
            to,
            yesterday: _,
            backfill,
        } => {
            let stats = match (date, from.zip(to), backfill) {
                (Some(date), _, _) => vec![aggregation.aggregate_for_date(date).await?],
                (_, Some((from, to)), _) => aggregation.aggregate_for_date_range(from, to).await?,
                (_, _, Some(days)) => aggregation.backfill(today, days).await?,
                _ => vec![aggregation.aggregate_yesterday().await?],
            };
            print_json(&stats)?;
        }
        UsageCommand::Orphaned { delete } => {
            if delete {
                let deleted = aggregation.delete_orphaned().await?;
                println!("已删除 {deleted} 条无用户归属的记录");
            } else {
                print_json(&aggregation.orphaned_summary().await?)?;
            }
        }
        UsageCommand::Dashboard { date } => {
            let overview = UsageDashboardService::new(db)
                .with_top_n(top_n)
                .overview(date.unwrap_or(today))
                .await?;
            print_json(&overview)?;
        }
    }
    Ok(())
}

async fn run_provider(db: &DatabaseConnection, command: ProviderCommand) -> anyhow::Result<()> {
    let providers = ProviderService::new(db);

    match command {
        ProviderCommand::List => {
            for provider in providers.list_ordered().await? {
                println!(
                    "{:>4}  {:<24} {:<24} {:<8} {}",
                    provider.display_order,
                    provider.unique_name,
                    provider.provider_name,
                    if provider.is_active { "active" } else { "inactive" },
                    provider.base_url.as_deref().unwrap_or("-"),
                );
            }
        }
        ProviderCommand::Resolve {
            unique_name,
            endpoint,
        } => {
            let provider = providers.get_by_unique_name(&unique_name).await?;
            match EndpointResolver::new(db)
                .resolve_url(&provider, &endpoint)
                .await?
            {
                Some(url) => println!("{url}"),
                None => eprintln!("{unique_name} 未定义端点 {endpoint}"),
            }
        }
        ProviderCommand::Status { unique_name } => {
            let provider = providers.get_by_unique_name(&unique_name).await?;
            print_json(&ProviderStatusService::new(db).health(&provider).await?)?;
        }
        ProviderCommand::Test { unique_name } => {
            let provider = providers.get_by_unique_name(&unique_name).await?;
            let catalog = ModelCatalogService::new(db, HttpModelSource::new());
            print_json(&catalog.test_connection(&provider).await?)?;
        }
        ProviderCommand::Sync { unique_name } => {
            let provider = providers.get_by_unique_name(&unique_name).await?;
            let catalog = ModelCatalogService::new(db, HttpModelSource::new());
            print_json(&catalog.sync_provider(&provider).await?)?;
        }
    }
    Ok(())
}

async fn run_mail(
    db: &DatabaseConnection,
    command: MailCommand,
    manager: &ConfigManager,
) -> anyhow::Result<()> {
    let config = manager.config();
    let templates = MailTemplateService::new(db);

    match command {
        MailCommand::List => {
            for template in templates.list().await? {
                println!(
                    "{:<14} {:<4} {}",
                    template.template_type, template.language, template.subject
                );
            }
        }
        MailCommand::Render {
            template_type,
            language,
            data,
        } => {
            let language = language.unwrap_or_else(|| config.mail.default_language.clone());
            let values: BTreeMap<String, String> = PlaceholderContext::standard(&config.app)
                .with_data(data)
                .into_values();
            let rendered = templates
                .render_template(&template_type, &language, &values)
                .await?;
            print_json(&rendered)?;
        }
        MailCommand::Preview {
            template_type,
            language,
            name,
            email,
        } => {
            let language = language.unwrap_or_else(|| config.mail.default_language.clone());
            let recipient = name.zip(email).map(|(name, email)| Recipient::new(name, email));
            let rendered = templates
                .preview(&template_type, &language, &config.app, recipient.as_ref())
                .await?;
            print_json(&rendered)?;
        }
        MailCommand::Placeholders { template_type } => {
            for (name, description) in available_placeholders(&template_type) {
                println!("{{{{{name}}}}}  {description}");
            }
        }
    }
    Ok(())
}

async fn run_announcement(
    db: &DatabaseConnection,
    command: AnnouncementCommand,
) -> anyhow::Result<()> {
    let announcements = AnnouncementService::new(db);

    match command {
        AnnouncementCommand::List => {
            for announcement in announcements.list().await? {
                println!(
                    "{:<4} {:<7} {:<9} {}",
                    announcement.id,
                    announcement.announcement_type.to_value(),
                    if announcement.is_published { "published" } else { "draft" },
                    announcement.title
                );
            }
        }
        AnnouncementCommand::Active { roles } => {
            let now = Utc::now().naive_utc();
            print_json(&announcements.published_for_roles(now, &roles).await?)?;
        }
        AnnouncementCommand::Publish { id } => {
            let announcement = announcements.publish(id).await?;
            println!("已发布: {}", announcement.title);
        }
        AnnouncementCommand::Unpublish { id } => {
            let announcement = announcements.unpublish(id).await?;
            println!("已取消发布: {}", announcement.title);
        }
        AnnouncementCommand::Render { id, locale } => {
            let announcement = announcements.find(id).await?;
            println!("{}", announcements.render(&announcement, &locale).await?);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let output = serde_json::to_string_pretty(value).context("序列化输出失败")?;
    println!("{output}");
    Ok(())
}
