//! Command-line client for the Promptshelf catalog.
//!
//! Talks to the hosted backend directly through the same controllers the HTTP API uses. Sign in
//! once with `sign-in`, then export the printed token as `PROMPTSHELF_TOKEN` (or pass `--token`)
//! to manage your own prompts and rules.
use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use promptshelf::{
    browser::{McpBrowser, Notice, PromptBrowser, RuleBrowser},
    catalog::{
        CatalogApi, CatalogService, ListScope, McpDirectory, McpSort, NewPrompt, NewRule,
        Session, TagInput, export_rule, visibility_label,
    },
    config, logging,
};

#[derive(Parser)]
#[command(
    name = "promptshelf-cli",
    about = "Browse and manage shared prompts, editor rules, and MCP servers"
)]
struct Cli {
    /// Access token printed by `sign-in`.
    #[arg(long, env = "PROMPTSHELF_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Exchange email and password for an access token.
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PROMPTSHELF_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session behind `--token`.
    SignOut,
    /// Work with prompts.
    #[command(subcommand)]
    Prompts(PromptCommand),
    /// Work with editor rules.
    #[command(subcommand)]
    Rules(RuleCommand),
    /// Browse the MCP server directory.
    #[command(subcommand)]
    Mcp(McpCommand),
    /// Print catalog counters and backend reachability.
    Status,
}

#[derive(Subcommand)]
enum PromptCommand {
    List {
        #[arg(long)]
        category: Option<String>,
        /// Repeat to match any of several tags.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Only your own prompts.
        #[arg(long)]
        mine: bool,
    },
    Show {
        id: String,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated tags.
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        private: bool,
    },
    /// Flip one of your prompts between public and private.
    ToggleVisibility {
        id: String,
    },
    Copy {
        id: String,
    },
    Delete {
        id: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
struct RuleFilters {
    #[arg(long)]
    framework: Option<String>,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    search: Option<String>,
    /// Only your own rules.
    #[arg(long)]
    mine: bool,
}

#[derive(Subcommand)]
enum RuleCommand {
    List {
        #[command(flatten)]
        filters: RuleFilters,
        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Frameworks and languages present in the catalog.
    Filters {
        #[arg(long)]
        mine: bool,
    },
    Show {
        id: String,
    },
    /// Save the rule as an `.mdc` file and count the download.
    Export {
        id: String,
        /// Target file; defaults to the rule's file name in the current directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        framework: String,
        #[arg(long)]
        language: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        glob: Option<String>,
        #[arg(long)]
        always_apply: bool,
        /// Comma-separated tags.
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        private: bool,
    },
    /// Flip one of your rules between public and private.
    ToggleVisibility {
        id: String,
    },
    Delete {
        id: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum McpCommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// rating, downloads, or name.
        #[arg(long, default_value = "rating")]
        sort: String,
    },
    Show {
        id: String,
    },
    Categories,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing_file_only();

    let directory = McpDirectory::load(&config::get_config().mcp_directory_path)
        .context("failed to load MCP directory")?;
    let service = Arc::new(CatalogService::new(directory).context("failed to build catalog")?);
    let session = if cli.command.uses_session() {
        resolve_session(service.as_ref(), cli.token.as_deref()).await?
    } else {
        None
    };

    match cli.command {
        Command::SignIn { email, password } => {
            let auth = service.sign_in(&email, &password).await?;
            println!("Signed in as {}", auth.user.email.as_deref().unwrap_or(&auth.user.id));
            println!("export PROMPTSHELF_TOKEN={}", auth.access_token);
        }
        Command::SignOut => {
            let session = session.ok_or_else(|| anyhow!("No session to sign out of"))?;
            service.sign_out(&session).await?;
            println!("Signed out");
        }
        Command::Prompts(command) => run_prompts(service, session, command).await?,
        Command::Rules(command) => run_rules(service, session, command).await?,
        Command::Mcp(command) => run_mcp(service, command)?,
        Command::Status => {
            let health = service.health().await;
            println!(
                "backend: {}",
                if health.reachable { "reachable" } else { "unreachable" }
            );
            if let Some(error) = health.error {
                println!("  {error}");
            }
            let snapshot = service.metrics_snapshot();
            println!(
                "reads={} mutations={} increments={} failures={}",
                snapshot.reads, snapshot.mutations, snapshot.counter_increments, snapshot.failures
            );
        }
    }
    Ok(())
}

impl Command {
    /// Whether the command acts as the signed-in user. Signing in, the offline MCP directory,
    /// and the status report never look at `--token`.
    fn uses_session(&self) -> bool {
        matches!(self, Self::SignOut | Self::Prompts(_) | Self::Rules(_))
    }
}

async fn resolve_session(service: &CatalogService, token: Option<&str>) -> Result<Option<Session>> {
    let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
        return Ok(None);
    };
    match service.current_user(token).await {
        Ok(Some(session)) => Ok(Some(session)),
        Ok(None) => bail!("Session expired or invalid; run `promptshelf-cli sign-in` again"),
        Err(err) => Err(err.into()),
    }
}

fn scope(mine: bool) -> ListScope {
    if mine {
        ListScope::Mine
    } else {
        ListScope::Public
    }
}

fn report(notice: Notice) -> Result<()> {
    if notice.is_error() {
        bail!(notice.message);
    }
    println!("{}", notice.message);
    Ok(())
}

fn tags_from(raw: Option<String>) -> TagInput {
    raw.map(TagInput::Text).unwrap_or_default()
}

async fn run_prompts(
    service: Arc<CatalogService>,
    session: Option<Session>,
    command: PromptCommand,
) -> Result<()> {
    match command {
        PromptCommand::List {
            category,
            tags,
            mine,
        } => {
            let mut browser = PromptBrowser::new(service, session, scope(mine));
            browser.refresh().await.map_err(|notice| anyhow!(notice.message))?;
            browser.select_category(category);
            for tag in &tags {
                browser.toggle_tag(tag);
            }
            for prompt in browser.visible() {
                println!(
                    "{:<38} {:<14} {:<8} {}",
                    prompt.id,
                    prompt.category,
                    visibility_label(prompt.is_public),
                    prompt.title
                );
            }
            let available = browser.available_tags();
            if !available.is_empty() {
                println!("tags: {}", available.join(", "));
            }
        }
        PromptCommand::Show { id } => {
            let prompt = service.get_prompt(&id, session.as_ref()).await?;
            println!("# {}", prompt.title);
            if let Some(description) = &prompt.description {
                println!("{description}");
            }
            println!(
                "category: {}  tags: {}  copies: {}",
                prompt.category,
                prompt.tag_list().join(", "),
                prompt.copies
            );
            println!();
            println!("{}", prompt.content);
        }
        PromptCommand::Create {
            title,
            category,
            content,
            description,
            tags,
            private,
        } => {
            let mut browser = PromptBrowser::new(service, session, ListScope::Mine);
            let notice = browser
                .create(NewPrompt {
                    title,
                    description,
                    category,
                    content,
                    tags: tags_from(tags),
                    is_public: !private,
                })
                .await;
            report(notice)?;
        }
        PromptCommand::ToggleVisibility { id } => {
            let mut browser = PromptBrowser::new(service, session, ListScope::Mine);
            browser.refresh().await.map_err(|notice| anyhow!(notice.message))?;
            report(browser.toggle_visibility(&id).await)?;
        }
        PromptCommand::Copy { id } => {
            let prompt = service.get_prompt(&id, session.as_ref()).await?;
            let copies = service.record_prompt_copy(&id, session.as_ref()).await?;
            println!("{}", prompt.content);
            eprintln!("copies: {copies}");
        }
        PromptCommand::Delete { id, yes } => {
            if !yes {
                bail!("Refusing to delete without --yes");
            }
            let mut browser = PromptBrowser::new(service, session, ListScope::Mine);
            report(browser.delete(&id).await)?;
        }
    }
    Ok(())
}

async fn run_rules(
    service: Arc<CatalogService>,
    session: Option<Session>,
    command: RuleCommand,
) -> Result<()> {
    match command {
        RuleCommand::List { filters, pages } => {
            let mut browser = RuleBrowser::new(service, session, scope(filters.mine));
            browser
                .set_filters(filters.framework, filters.language, filters.search)
                .await
                .map_err(|notice| anyhow!(notice.message))?;
            while browser.page() < pages && browser.has_more() {
                browser
                    .load_more()
                    .await
                    .map_err(|notice| anyhow!(notice.message))?;
            }
            for rule in browser.rules() {
                println!(
                    "{:<38} {:<12} {:<12} {:>5} dl  {}",
                    rule.id,
                    rule.framework,
                    rule.language,
                    rule.download_count(),
                    rule.title
                );
            }
            if browser.has_more() {
                println!("(more rules available; pass --pages {})", browser.page() + 1);
            }
        }
        RuleCommand::Filters { mine } => {
            let mut browser = RuleBrowser::new(service, session, scope(mine));
            browser
                .load_filter_options()
                .await
                .map_err(|notice| anyhow!(notice.message))?;
            let options = browser.filter_options();
            println!("frameworks: {}", options.frameworks.join(", "));
            println!("languages: {}", options.languages.join(", "));
        }
        RuleCommand::Show { id } => {
            let rule = service.get_rule(&id, session.as_ref()).await?;
            println!("{}", export_rule(&rule).content);
        }
        RuleCommand::Export { id, output } => {
            let rule = service.get_rule(&id, session.as_ref()).await?;
            let document = export_rule(&rule);
            let path = output.unwrap_or_else(|| PathBuf::from(&document.file_name));
            fs::write(&path, &document.content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            let downloads = service.record_rule_download(&id, session.as_ref()).await?;
            println!("Rule downloaded! {} ({downloads} downloads)", path.display());
        }
        RuleCommand::Create {
            title,
            framework,
            language,
            content,
            description,
            glob,
            always_apply,
            tags,
            private,
        } => {
            let mut browser = RuleBrowser::new(service, session, ListScope::Mine);
            let notice = browser
                .create(NewRule {
                    title,
                    description,
                    framework,
                    language,
                    content,
                    glob,
                    always_apply,
                    is_public: !private,
                    tags: tags_from(tags),
                })
                .await;
            report(notice)?;
        }
        RuleCommand::ToggleVisibility { id } => {
            let mut browser = RuleBrowser::new(service, session, ListScope::Mine);
            browser.refresh().await.map_err(|notice| anyhow!(notice.message))?;
            while browser.rules().iter().all(|rule| rule.id != id) && browser.has_more() {
                browser
                    .load_more()
                    .await
                    .map_err(|notice| anyhow!(notice.message))?;
            }
            report(browser.toggle_visibility(&id).await)?;
        }
        RuleCommand::Delete { id, yes } => {
            if !yes {
                bail!("Refusing to delete without --yes");
            }
            let mut browser = RuleBrowser::new(service, session, ListScope::Mine);
            report(browser.delete(&id).await)?;
        }
    }
    Ok(())
}

fn run_mcp(service: Arc<CatalogService>, command: McpCommand) -> Result<()> {
    let mut browser = McpBrowser::new(service);
    match command {
        McpCommand::List {
            search,
            category,
            sort,
        } => {
            let sort: McpSort = sort
                .parse()
                .map_err(|()| anyhow!("Unknown sort order `{sort}`"))?;
            browser.set_search(search);
            browser.set_category(category);
            browser.set_sort(sort);
            for listing in browser.visible() {
                println!(
                    "{:<28} {:<16} {:>4.1} {:>8}  {}",
                    listing.id, listing.category, listing.rating, listing.downloads, listing.name
                );
            }
        }
        McpCommand::Show { id } => {
            let listing = browser.detail(&id).map_err(|notice| anyhow!(notice.message))?;
            println!("{} v{} by {}", listing.name, listing.version, listing.author);
            println!(
                "{}",
                listing
                    .full_description
                    .as_deref()
                    .unwrap_or(&listing.description)
            );
            if let Some(command) = &listing.install_command {
                println!("install: {command}");
            }
            if let Some(url) = &listing.github_url {
                println!("source: {url}");
            }
            for feature in &listing.features {
                println!("  - {feature}");
            }
        }
        McpCommand::Categories => {
            for category in browser.categories() {
                println!("{category}");
            }
        }
    }
    Ok(())
}
