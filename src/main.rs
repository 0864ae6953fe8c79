//! jira-api-client - command line front end for the JIRA client facade.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info};

use jira_api_client::api::{JiraClient, NewIssue, SearchQuery, DEFAULT_PAGE_SIZE};
use jira_api_client::config::{default_config_path, ConfigFile, ConnectionConfig, EnvSource};
use jira_api_client::error::Result;
use jira_api_client::{logging, Issue};

#[derive(Debug, Parser)]
#[command(name = "jira-api-client", version, about = "Query and create JIRA issues")]
struct Cli {
    /// Path to the config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write debug logs (ignored when RUST_LOG is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show a single issue.
    Issue {
        /// Issue key, e.g. PROJ-123.
        key: String,

        /// Save `<KEY>.txt` and `<KEY>_details.xml`.
        #[arg(long)]
        save: bool,

        /// Directory for saved files.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Run a JQL search.
    Search {
        jql: String,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,

        /// Stop after this many issues.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Create an issue and print it as stored.
    Create {
        #[arg(long)]
        project: String,

        #[arg(long = "type")]
        issue_type: String,

        #[arg(long)]
        summary: String,

        #[arg(long)]
        description: Option<String>,

        /// Extra field as name=value; JSON values are sent as-is.
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// Show the authenticated user.
    Whoami,
    /// Print the config file path, creating the template if absent.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_dir = match logging::init(cli.verbose) {
        Ok(dir) => Some(dir),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        }
    };

    let outcome = run(cli).await;
    logging::shutdown();

    if let Err(e) = outcome {
        error!("Command failed: {}", e);
        eprintln!("Error: {}", e.user_message());
        if let Some(request_id) = e.request_id() {
            eprintln!("Request id: {}", request_id);
        }
        if let Some(action) = e.suggested_action() {
            eprintln!("{}", action);
        } else if e.is_recoverable() {
            eprintln!("This may be temporary; try the command again.");
        }
        if let Some(dir) = log_dir {
            eprintln!("Logs: {}", dir.display());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let file = ConfigFile::load_or_create(&path)?;

    let command = match cli.command {
        Command::Config => {
            println!("{}", file.path().display());
            return Ok(());
        }
        command => command,
    };

    let config: ConnectionConfig = file.connection(EnvSource)?;
    info!(
        base_url = %config.base_url,
        user = config.credentials.username().unwrap_or("<token>"),
        "Loaded configuration"
    );
    let client = JiraClient::new(config)?;

    match command {
        Command::Issue { key, save, out } => {
            let issue = client.get_issue(&key).await?;
            print_issue(&issue);
            if save {
                let xml = client.issue_xml(issue.key()).await?;
                let (txt_path, xml_path) = save_issue(&issue, &xml, &out)?;
                println!();
                println!("Saved {}", txt_path.display());
                println!("Saved {}", xml_path.display());
            }
        }
        Command::Search {
            jql,
            page_size,
            limit,
        } => {
            let mut search = client.search_issues(SearchQuery::new(jql).page_size(page_size));
            let limit = limit.unwrap_or(usize::MAX);
            let mut shown = 0;
            while shown < limit {
                let Some(issue) = search.next().await else {
                    break;
                };
                let issue = issue?;
                println!("{:<12} {:<16} {}", issue.key(), issue.status(), issue.summary());
                shown += 1;
            }
            println!("{} issue(s)", shown);
        }
        Command::Create {
            project,
            issue_type,
            summary,
            description,
            fields,
        } => {
            let mut new_issue = NewIssue::new()
                .project(&project)
                .issue_type(&issue_type)
                .summary(&summary);
            if let Some(description) = description {
                new_issue = new_issue.description(&description);
            }
            for (name, value) in fields {
                new_issue = new_issue.field(&name, value);
            }

            let issue = client.create_issue(&new_issue).await?;
            println!("Created {}", issue.key());
            print_issue(&issue);
        }
        Command::Whoami => {
            let user = client.current_user().await?;
            let login = user
                .name
                .as_deref()
                .or(user.account_id.as_deref())
                .unwrap_or_default();
            println!("{} ({})", user.display_name, login);
            if !user.email_address.is_empty() {
                println!("{}", user.email_address);
            }
        }
        Command::Config => {}
    }

    Ok(())
}

fn print_issue(issue: &Issue) {
    println!("{}", issue);
    println!("  Status:   {}", issue.status());
    println!("  Assignee: {}", issue.assignee_name());
    if let Some(issue_type) = issue.issue_type() {
        println!("  Type:     {}", issue_type);
    }
    if let Some(priority) = issue.priority() {
        println!("  Priority: {}", priority);
    }
    if !issue.description().is_empty() {
        println!();
        println!("{}", issue.description());
    }
}

/// Write `<KEY>.txt` with the summary line and `<KEY>_details.xml` with the
/// XML export into `dir`.
fn save_issue(issue: &Issue, xml: &str, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;

    let txt_path = dir.join(format!("{}.txt", issue.key()));
    let xml_path = dir.join(format!("{}_details.xml", issue.key()));
    fs::write(&txt_path, format!("{}\n", issue))?;
    fs::write(&xml_path, xml)?;

    Ok((txt_path, xml_path))
}

fn parse_field(raw: &str) -> std::result::Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_field_json_and_string() {
        assert_eq!(
            parse_field("priority={\"name\":\"High\"}").unwrap(),
            ("priority".to_string(), json!({ "name": "High" }))
        );
        assert_eq!(
            parse_field("customfield_10016=5").unwrap(),
            ("customfield_10016".to_string(), json!(5))
        );
        assert_eq!(
            parse_field("environment=prod eu-west").unwrap(),
            ("environment".to_string(), json!("prod eu-west"))
        );
    }

    #[test]
    fn test_parse_field_rejects_bad_input() {
        assert!(parse_field("no-equals").is_err());
        assert!(parse_field("=value").is_err());
    }

    #[test]
    fn test_save_issue_writes_both_files() {
        let dir = TempDir::new().unwrap();
        let issue = Issue::from_value(json!({
            "id": "1",
            "key": "PROJ-7",
            "fields": { "summary": "Export me", "status": { "name": "Done" } }
        }))
        .unwrap();

        let out = dir.path().join("exports");
        let (txt, xml) = save_issue(&issue, "<rss/>", &out).unwrap();

        assert_eq!(txt, out.join("PROJ-7.txt"));
        assert_eq!(xml, out.join("PROJ-7_details.xml"));
        assert_eq!(fs::read_to_string(txt).unwrap(), "PROJ-7: Export me\n");
        assert_eq!(fs::read_to_string(xml).unwrap(), "<rss/>");
    }

    #[test]
    fn test_cli_parses_create() {
        let cli = Cli::try_parse_from([
            "jira-api-client",
            "create",
            "--project",
            "PROJ",
            "--type",
            "Bug",
            "--summary",
            "Broken",
            "--field",
            "labels=[\"a\"]",
        ])
        .unwrap();

        match cli.command {
            Command::Create {
                issue_type, fields, ..
            } => {
                assert_eq!(issue_type, "Bug");
                assert_eq!(fields, vec![("labels".to_string(), json!(["a"]))]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
