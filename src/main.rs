use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

mod bootstrap;
mod config;
mod config_api;
mod editor;
mod error;
mod forms;
mod gateway;
mod model;
mod notify;
mod progress;
mod quick_add;
mod render;
mod reorder;
mod service_check;
mod settings;
mod stats;
mod store;
mod validation;

use config::ClientConfig;
use config_api::{default_backup_name, ConfigClient, ConfigDocument, ConfigType};
use editor::ListEditor;
use forms::{BookmarkForm, ItemForm, ServiceForm};
use gateway::{DryRunGateway, HttpGateway, PersistenceGateway, SaveOutcome};
use model::{Bookmarks, ItemKind, Services};
use notify::TracingNotifier;
use render::FragmentView;
use reorder::{GroupDrop, ItemDrop};
use settings::SettingsForm;
use stats::Stats;
use store::ListStore;

#[derive(Parser)]
#[command(name = "homeman-admin")]
#[command(about = "Admin client for a self-hosted dashboard: bookmarks, services, YAML configs and backups", long_about = None)]
#[command(version)]
struct Cli {
    /// Admin backend base URL (overrides HOMEMAN_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Request timeout in seconds (overrides HOMEMAN_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Load bookmarks/services from a JSON export instead of the live page
    #[arg(long, global = true)]
    from_file: Option<PathBuf>,

    /// Dry run - show what would be saved without sending it
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage bookmark groups and bookmarks
    Bookmarks {
        #[command(subcommand)]
        action: ListAction,
    },

    /// Manage service groups and services
    Services {
        #[command(subcommand)]
        action: ListAction,
    },

    /// View, validate and save the YAML config files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Create, inspect and restore config backups
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Update global dashboard settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Show overview statistics
    Stats {
        /// Compute from local JSON exports instead of the overview page
        #[arg(long, requires = "services_file")]
        bookmarks_file: Option<PathBuf>,

        #[arg(long, requires = "bookmarks_file")]
        services_file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ListAction {
    /// Print all groups and entries
    List {
        /// Print the rendered card HTML instead of a tree
        #[arg(long)]
        html: bool,
    },

    /// Add an empty group at the end
    AddGroup { name: String },

    /// Rename a group, keeping its position
    RenameGroup { old: String, new: String },

    /// Remove a group and everything in it
    RemoveGroup { name: String },

    /// Add an entry to a group
    Add {
        group: String,
        #[command(flatten)]
        fields: ItemFields,
    },

    /// Edit an entry; unspecified fields keep their values
    Edit {
        group: String,
        name: String,
        #[command(flatten)]
        fields: ItemFields,
    },

    /// Rename an entry
    Rename { group: String, old: String, new: String },

    /// Remove an entry
    Remove { group: String, name: String },

    /// Remove several entries at once, given as GROUP/NAME
    RemoveMany {
        #[arg(required = true)]
        entries: Vec<String>,
    },

    /// Move an entry, within its group or into another one
    Move {
        from_group: String,
        from_index: usize,
        to_index: usize,

        /// Target group (defaults to the source group)
        #[arg(long)]
        to_group: Option<String>,
    },

    /// Move a whole group
    MoveGroup { from_index: usize, to_index: usize },

    /// Add an entry from a bare URL, deriving its name
    QuickAdd { group: String, url: String },

    /// Test that an entry's URL responds
    Check { group: String, name: String },

    /// Export the list as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the whole list with a JSON export
    Import { file: PathBuf },
}

#[derive(Args, Debug, Default)]
struct ItemFields {
    /// Entry name (on edit: the new name)
    #[arg(long = "name", id = "item_name")]
    name: Option<String>,
    #[arg(long)]
    href: Option<String>,
    #[arg(long)]
    icon: Option<String>,
    /// Abbreviation shown instead of an icon (bookmarks only)
    #[arg(long)]
    abbr: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Widget type (services only)
    #[arg(long)]
    widget_type: Option<String>,
    #[arg(long)]
    widget_url: Option<String>,
    /// Widget fields as a JSON array
    #[arg(long)]
    widget_fields: Option<String>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show which config files exist
    Status,

    /// Print a config file
    Show { config_type: ConfigType },

    /// Render a server-side preview of YAML
    Preview {
        config_type: ConfigType,
        /// Preview YAML from this file instead of the saved config
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Validate YAML against the backend
    Validate {
        config_type: ConfigType,
        /// Read YAML from this file instead of the saved config
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Validate and save YAML from a file
    Save { config_type: ConfigType, file: PathBuf },

    /// Delete a config file
    Delete { config_type: ConfigType },

    /// Validate every config file on the backend
    ValidateAll,

    /// Check config integrity
    Check,

    /// Clear the backend's config cache
    ClearCache,

    /// Download all configs as one archive
    Export {
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Replace all configs from a .tar.gz archive
    Import { file: PathBuf },
}

#[derive(Subcommand)]
enum BackupAction {
    /// List backups
    List,

    /// Create a backup (default name: backup_<date>)
    Create { name: Option<String> },

    /// Delete a backup
    Delete { name: String },

    /// Show the contents of a backup
    Preview { name: String },

    /// Restore configs from a backup
    Restore { name: String },

    /// Download a backup archive
    Download {
        name: String,
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Submit settings; only the given fields are sent
    Set {
        /// Start from a settings JSON export; flags override its values
        #[arg(long = "import", value_name = "FILE")]
        import: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        base: Option<String>,
        #[arg(long)]
        favicon: Option<String>,
        #[arg(long)]
        background: Option<String>,
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        header_style: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        language: Option<String>,
        /// Max service group columns (1-8)
        #[arg(long)]
        columns: Option<String>,
        /// Max bookmark group columns (1-8)
        #[arg(long)]
        bookmark_columns: Option<String>,
    },

    /// Export the current settings form as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// 命令行字段合并进条目表单
trait CliForm<K: ItemKind>: ItemForm<K> + Default {
    fn apply(&mut self, fields: ItemFields) -> Result<()>;
}

impl CliForm<Bookmarks> for BookmarkForm {
    fn apply(&mut self, fields: ItemFields) -> Result<()> {
        if fields.widget_type.is_some() || fields.widget_url.is_some() || fields.widget_fields.is_some() {
            bail!("书签不支持小工具");
        }
        merge(&mut self.name, fields.name);
        merge(&mut self.href, fields.href);
        merge(&mut self.icon, fields.icon);
        merge(&mut self.abbr, fields.abbr);
        merge(&mut self.description, fields.description);
        fill_name(&mut self.name, &self.href);
        Ok(())
    }
}

impl CliForm<Services> for ServiceForm {
    fn apply(&mut self, fields: ItemFields) -> Result<()> {
        if fields.abbr.is_some() {
            bail!("服务不支持缩写");
        }
        merge(&mut self.name, fields.name);
        merge(&mut self.href, fields.href);
        merge(&mut self.icon, fields.icon);
        merge(&mut self.description, fields.description);
        merge(&mut self.widget_type, fields.widget_type);
        merge(&mut self.widget_url, fields.widget_url);
        merge(&mut self.widget_fields, fields.widget_fields);
        fill_name(&mut self.name, &self.href);
        Ok(())
    }
}

fn merge(slot: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// 没给名称时由链接推导
fn fill_name(name: &mut String, href: &str) {
    if name.trim().is_empty() {
        if let Some(derived) = validation::auto_fill_name(href) {
            info!("✨ 自动填充名称: {}", derived);
            *name = derived;
        }
    }
}

/// 失败的保存变成非零退出
fn settle(outcome: SaveOutcome) -> Result<()> {
    match outcome {
        SaveOutcome::Failed(message) => Err(anyhow!(message)),
        other if other.is_failure() => bail!("保存失败"),
        _ => Ok(()),
    }
}

fn parse_entry(raw: &str) -> Result<(String, String)> {
    raw.split_once('/')
        .map(|(group, name)| (group.to_string(), name.to_string()))
        .ok_or_else(|| anyhow!("条目格式应为 GROUP/NAME: {}", raw))
}

/// 从导出文件或在线页面加载列表
///
/// `strict` 时页面缺数据直接报错，否则按空列表处理。
async fn load_store<K: ItemKind>(config: &ClientConfig, from_file: Option<&Path>, strict: bool) -> Result<ListStore<K>> {
    if let Some(path) = from_file {
        let text = read_text(path).await?;
        let store = ListStore::from_json(&text).with_context(|| format!("解析 {} 失败", path.display()))?;
        info!("📂 从文件加载{}: {} 个分组", K::LABEL, store.group_count());
        return Ok(store);
    }

    let gateway = HttpGateway::new(config.clone())?;
    let html = progress::track(&format!("加载{}页面", K::LABEL), gateway.fetch_page(K::ENDPOINT)).await?;
    if !strict {
        return Ok(bootstrap::load_list(&html));
    }
    // 页面缺数据时不能拿空列表去覆盖服务端
    bootstrap::try_load_list::<K>(&html).ok_or_else(|| anyhow!("{}页面缺少 #{} 数据", K::LABEL, K::DATA_ELEMENT))
}

async fn run_list<K, F>(config: &ClientConfig, from_file: Option<&Path>, dry_run: bool, action: ListAction) -> Result<()>
where
    K: ItemKind,
    F: CliForm<K>,
{
    let read_only = matches!(action, ListAction::List { .. } | ListAction::Export { .. } | ListAction::Check { .. });
    let store = load_store::<K>(config, from_file, !read_only).await?;
    if dry_run {
        info!("🔍 Dry run 模式，修改不会提交");
        run_list_action::<K, F, _>(config, store, Arc::new(DryRunGateway), action).await
    } else {
        let gateway = Arc::new(HttpGateway::new(config.clone())?);
        run_list_action::<K, F, _>(config, store, gateway, action).await
    }
}

async fn run_list_action<K, F, G>(config: &ClientConfig, store: ListStore<K>, gateway: Arc<G>, action: ListAction) -> Result<()>
where
    K: ItemKind,
    F: CliForm<K>,
    G: PersistenceGateway + 'static,
{
    let mut editor = ListEditor::new(store, gateway, FragmentView::new(), TracingNotifier);

    match action {
        ListAction::List { html } => {
            if html {
                println!("{}", editor.view().to_html());
            } else {
                print_tree(editor.store());
            }
        }

        ListAction::AddGroup { name } => {
            editor.open_add_group();
            settle(editor.submit_group_form(&name).await?)?;
        }

        ListAction::RenameGroup { old, new } if !K::INLINE_GROUP_RENAME => {
            editor.open_edit_group(&old)?;
            settle(editor.submit_group_form(&new).await?)?;
        }

        ListAction::RenameGroup { old, new } => {
            editor.begin_inline_rename(&old)?;
            match editor.finish_inline_rename(&new).await {
                Ok(Some(outcome)) => settle(outcome)?,
                Ok(None) => info!("ℹ️  分组名称未改变"),
                Err(err) => {
                    editor.cancel_inline_rename();
                    return Err(err.into());
                }
            }
        }

        ListAction::RemoveGroup { name } => {
            settle(editor.delete_group(&name).await?)?;
        }

        ListAction::Add { group, fields } => {
            editor.open_add_item(&group)?;
            let mut form = F::default();
            form.apply(fields)?;
            settle(editor.submit_item_form(form).await?)?;
        }

        ListAction::Edit { group, name, fields } => {
            let mut form: F = editor.open_edit_item(&group, &name)?;
            form.apply(fields)?;
            settle(editor.submit_item_form(form).await?)?;
        }

        ListAction::Rename { group, old, new } => {
            settle(editor.rename_item(&group, &old, &new).await?)?;
        }

        ListAction::Remove { group, name } => {
            settle(editor.delete_item(&group, &name).await?)?;
        }

        ListAction::RemoveMany { entries } => {
            let selected = entries.iter().map(|raw| parse_entry(raw)).collect::<Result<Vec<_>>>()?;
            settle(editor.delete_selected(&selected).await?)?;
        }

        ListAction::Move { from_group, from_index, to_index, to_group } => {
            let drop = ItemDrop {
                to_group: to_group.unwrap_or_else(|| from_group.clone()),
                from_group,
                old_index: from_index,
                new_index: to_index,
            };
            match editor.on_item_drop(drop).await {
                Some(outcome) => settle(outcome)?,
                None => warn!("⚠️  没有需要移动的{}", K::LABEL),
            }
        }

        ListAction::MoveGroup { from_index, to_index } => {
            let drop = GroupDrop { old_index: from_index, new_index: to_index };
            match editor.on_group_drop(drop).await {
                Some(outcome) => settle(outcome)?,
                None => warn!("⚠️  没有需要移动的分组"),
            }
        }

        ListAction::QuickAdd { group, url } => {
            let (name, outcome) = editor.quick_add(&group, &url).await?;
            settle(outcome)?;
            println!("{}", name);
        }

        ListAction::Check { group, name } => {
            let item = editor
                .store()
                .item(&group, &name)
                .ok_or_else(|| anyhow!("分组 \"{}\" 中找不到 \"{}\"", group, name))?;
            let url = service_check::resolve_href(config, &item.config.href)?;
            let client = config.build_client()?;
            let pb = progress::create_spinner("正在测试连接");
            let check = service_check::check_service(&client, url).await;
            match check.status_code {
                Some(code) => {
                    progress::finish_with_success(&pb, &format!("服务连接正常 (HTTP {}, {} ms)", code, check.latency_ms));
                    println!("{} {}", code, check.url);
                }
                None => {
                    progress::finish_with_error(&pb, "连接失败");
                    bail!("无法连接到服务，请检查URL是否正确: {} ({})", check.url, check.error.unwrap_or_default());
                }
            }
        }

        ListAction::Export { output } => {
            let json = editor.export_json()?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("写入 {} 失败", path.display()))?;
                    info!("📤 已导出到 {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        ListAction::Import { file } => {
            let text = read_text(&file).await?;
            settle(editor.import_json(&text).await?)?;
        }
    }

    Ok(())
}

fn print_tree<K: ItemKind>(store: &ListStore<K>) {
    if store.group_count() == 0 {
        println!("(没有{}分组)", K::LABEL);
        return;
    }
    for (index, group) in store.groups().iter().enumerate() {
        println!("{}. 📁 {} ({})", index, group.name, group.items.len());
        for (position, item) in group.items.iter().enumerate() {
            let mut line = format!("   {}. {} → {}", position, item.name, item.config.href);
            if let Some(widget) = &item.config.widget {
                line.push_str(&format!(" [widget: {}]", widget.kind));
            }
            println!("{}", line);
        }
    }
}

async fn run_config(config: &ClientConfig, action: ConfigAction) -> Result<()> {
    let client = ConfigClient::new(config.clone())?;
    match action {
        ConfigAction::Status => {
            let status = match progress::track("刷新配置状态", client.config_status()).await {
                Ok(status) => status,
                Err(err) => {
                    warn!("⚠️  {:#}，改用配置页面数据", err);
                    let gateway = HttpGateway::new(config.clone())?;
                    let html = progress::track("加载配置页面", gateway.fetch_page("/config")).await?;
                    bootstrap::load_config_status(&html)
                }
            };
            for config_type in ConfigType::ALL {
                match status.get(config_type.as_str()) {
                    Some(file) if file.exists => println!(
                        "✅ {:<14} {} 字节  {}",
                        config_type.file_name(),
                        file.size,
                        file.modified.as_deref().unwrap_or("-")
                    ),
                    _ => println!("❌ {:<14} 不存在", config_type.file_name()),
                }
            }
        }

        ConfigAction::Show { config_type } => {
            let loaded = progress::track("加载配置", client.load_config(config_type)).await?;
            let document = ConfigDocument::new(config_type, loaded);
            if !document.exists() {
                warn!("⚠️  {} 尚不存在", config_type.file_name());
            }
            println!("{}", document.content());
        }

        ConfigAction::Preview { config_type, file } => {
            let mut document = ConfigDocument::new(config_type, client.load_config(config_type).await?);
            if let Some(path) = file {
                document.set_content(read_text(&path).await?);
            }
            match progress::track("生成预览", document.preview(&client)).await? {
                Some(preview) => println!("{}", preview),
                None => bail!("配置内容为空，无法预览"),
            }
        }

        ConfigAction::Validate { config_type, file } => {
            let mut document = ConfigDocument::new(config_type, client.load_config(config_type).await?);
            if let Some(path) = file {
                document.set_content(read_text(&path).await?);
            }
            match document.validate(&client).await? {
                Some(result) if result.valid => info!("✅ YAML 格式正确"),
                Some(result) => bail!("YAML 格式错误: {}", result.message.unwrap_or_default()),
                None => {}
            }
        }

        ConfigAction::Save { config_type, file } => {
            let mut document = ConfigDocument::new(config_type, client.load_config(config_type).await?);
            document.set_content(read_text(&file).await?);
            if !document.is_dirty() {
                info!("ℹ️  {} 没有变化", config_type.file_name());
                return Ok(());
            }
            if let Some(result) = document.validate(&client).await? {
                if !result.valid {
                    bail!("YAML 格式错误: {}", result.message.unwrap_or_default());
                }
            }
            let message = progress::track("保存配置", document.save(&client)).await?;
            info!("✅ {}", message);
        }

        ConfigAction::Delete { config_type } => {
            client.delete_config(config_type).await?;
            info!("🗑️  已删除 {}", config_type.file_name());
        }

        ConfigAction::ValidateAll => {
            let results = progress::track("验证全部配置", client.validate_all_configs()).await?;
            let mut failed = 0;
            for (name, result) in &results {
                if result.valid {
                    println!("✅ {}.yaml", name);
                } else {
                    failed += 1;
                    println!("❌ {}.yaml  {}", name, result.message.as_deref().unwrap_or_default());
                }
            }
            if failed > 0 {
                bail!("{} 个配置未通过验证", failed);
            }
        }

        ConfigAction::Check => {
            let issues = progress::track("检查配置完整性", client.check_integrity()).await?;
            for issue in &issues {
                println!("⚠️  {}: {}", issue.config, issue.message);
            }
        }

        ConfigAction::ClearCache => {
            client.clear_cache().await?;
        }

        ConfigAction::Export { dir } => {
            let path = progress::track("导出配置", client.export_configs(&dir, Local::now().date_naive())).await?;
            info!("📥 已保存到 {}", path.display());
        }

        ConfigAction::Import { file } => {
            let message = progress::track("导入配置", client.import_configs(&file)).await?;
            info!("✅ {}", message);
        }
    }
    Ok(())
}

async fn run_backup(config: &ClientConfig, action: BackupAction) -> Result<()> {
    let client = ConfigClient::new(config.clone())?;
    match action {
        BackupAction::List => {
            let backups = progress::track("加载备份列表", client.list_backups()).await?;
            if backups.is_empty() {
                println!("(没有备份)");
            }
            for backup in backups {
                println!("📦 {}  {}", backup.name, backup.date.as_deref().unwrap_or("-"));
            }
        }

        BackupAction::Create { name } => {
            let name = name.unwrap_or_else(|| default_backup_name(Local::now()));
            let path = progress::track("创建备份", client.create_backup(&name)).await?;
            match path {
                Some(path) => info!("✅ 备份已创建: {}", path),
                None => info!("✅ 备份已创建: {}", name),
            }
        }

        BackupAction::Delete { name } => {
            client.delete_backup(&name).await?;
            info!("🗑️  已删除备份 {}", name);
        }

        BackupAction::Preview { name } => {
            println!("{}", client.preview_backup(&name).await?);
        }

        BackupAction::Restore { name } => {
            let message = progress::track("恢复备份", client.restore_backup(&name)).await?;
            info!("✅ {}", message);
        }

        BackupAction::Download { name, dir } => {
            let path = progress::track("下载备份", client.download_backup(&name, &dir)).await?;
            info!("📥 已保存到 {}", path.display());
        }
    }
    Ok(())
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取 {} 失败", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stdout 留给导出内容)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    let Cli { url, timeout, from_file, dry_run, command } = Cli::parse();
    let config = ClientConfig::from_env().with_overrides(url, timeout);
    let from_file = from_file.as_deref();

    match command {
        Commands::Bookmarks { action } => {
            run_list::<Bookmarks, BookmarkForm>(&config, from_file, dry_run, action).await?;
        }

        Commands::Services { action } => {
            run_list::<Services, ServiceForm>(&config, from_file, dry_run, action).await?;
        }

        Commands::Config { action } => {
            run_config(&config, action).await?;
        }

        Commands::Backup { action } => {
            run_backup(&config, action).await?;
        }

        Commands::Settings { action: SettingsAction::Set { import, title, base, favicon, background, theme, color, header_style, target, language, columns, bookmark_columns } } => {
            let flags = SettingsForm {
                title,
                base,
                favicon,
                background,
                theme,
                color,
                header_style,
                target,
                language,
                columns,
                bookmark_columns,
            };
            let form = match import {
                Some(path) => {
                    let imported = settings::parse_settings_json(&read_text(&path).await?)?;
                    info!("📥 已导入设置 {}，请检查后保存", path.display());
                    imported.overlay(flags)
                }
                None => flags,
            };
            if dry_run {
                let errors = form.validate();
                for err in &errors {
                    warn!("⚠️  {}", err);
                }
                if !errors.is_empty() {
                    bail!("设置验证失败");
                }
                info!("🔍 [dry-run] 将提交: {:?}", form.to_form_pairs()?);
            } else {
                progress::track("保存设置", settings::submit_settings(&config, &form)).await?;
            }
        }

        Commands::Settings { action: SettingsAction::Export { output } } => {
            let pairs = progress::track("导出设置", settings::export_settings(&config)).await?;
            let json = serde_json::to_string_pretty(&pairs)?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("写入 {} 失败", path.display()))?;
                    info!("✅ 设置已导出为JSON文件: {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Stats { bookmarks_file, services_file } => {
            let stats = match (bookmarks_file, services_file) {
                (Some(bookmarks), Some(services)) => {
                    let bookmarks = load_store::<Bookmarks>(&config, Some(bookmarks.as_path()), true).await?;
                    let services = load_store::<Services>(&config, Some(services.as_path()), true).await?;
                    Stats::from_lists(&bookmarks, &services)
                }
                _ => {
                    let client = ConfigClient::new(config.clone())?;
                    match progress::track("刷新统计", client.stats()).await {
                        Ok(stats) => stats,
                        Err(err) => {
                            warn!("⚠️  {:#}，改用概览页面数据", err);
                            let gateway = HttpGateway::new(config.clone())?;
                            let html = progress::track("加载概览页面", gateway.fetch_page("/")).await?;
                            bootstrap::load_stats(&html)
                        }
                    }
                }
            };
            println!("{}", stats);
        }
    }

    Ok(())
}
