mod args;
mod entities;
mod kickoff;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use console::style;

use crate::core::api::{AgentSpec, CrewProcess, CrewSpec, EntityStore, HttpEntityStore, TaskSpec};
use crate::core::config::CrewdeckConfig;
use crate::core::terminal::{self, GuideSection};
use crate::logging;
use args::{has_flag, parse_list_flag, parse_string_flag, positional_args, verbosity};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Entities")
        .command("agents list", "List agents")
        .command(
            "agents create --role R --goal G --backstory B",
            "Create an agent [--llm M] [--tools a,b] [--no-delegation] [--verbose-agent]",
        )
        .command("tasks list", "List tasks")
        .command(
            "tasks create --description D --expected-output E --agent R",
            "Create a task assigned to an agent role",
        )
        .command("crews list", "List crews")
        .command(
            "crews create --agents a,b --tasks t1,t2",
            "Create a crew [--process sequential|hierarchical] [--manager-llm M]",
        )
        .print();

    GuideSection::new("Executions")
        .command(
            "kickoff <crew_id>... --inputs '<json>'",
            "Start crews and watch them until they finish",
        )
        .command("status <execution_id>", "Query an execution once")
        .print();

    GuideSection::new("Diagnostics")
        .command("ping", "Check the backend is reachable")
        .print();

    GuideSection::new("Global flags")
        .command("--api-url <url>", "Backend base URL (overrides config)")
        .command("--config <path>", "Config file (default: $CREWDECK_CONFIG or user config dir)")
        .command("-v, -vv", "More log output on stderr")
        .print();

    println!(
        "\n {} {} <command> [subcommand]\n",
        style("Usage:").bold(),
        style("crewdeck").green()
    );
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Help,
    Ping,
    ListAgents,
    CreateAgent(AgentSpec),
    ListTasks,
    CreateTask(TaskSpec),
    ListCrews,
    CreateCrew(CrewSpec),
    Kickoff {
        crew_ids: Vec<String>,
        inputs: String,
    },
    Status {
        execution_id: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Invocation {
    pub api_url: Option<String>,
    pub config: Option<PathBuf>,
    pub verbosity: u8,
    pub command: Command,
}

pub(crate) fn parse_invocation(args: &[String]) -> Result<Invocation> {
    let positional = positional_args(args);
    let group = positional.first().map(|s| s.to_lowercase());
    let action = positional.get(1).map(|s| s.to_lowercase());

    let command = if has_flag(args, "--help") || has_flag(args, "-h") {
        Command::Help
    } else {
        match (group.as_deref(), action.as_deref()) {
            (None, _) | (Some("help"), _) => Command::Help,
            (Some("ping"), _) => Command::Ping,
            (Some("agents" | "agent"), Some("list" | "ls")) => Command::ListAgents,
            (Some("agents" | "agent"), Some("create")) => Command::CreateAgent(agent_from_args(args)?),
            (Some("tasks" | "task"), Some("list" | "ls")) => Command::ListTasks,
            (Some("tasks" | "task"), Some("create")) => Command::CreateTask(task_from_args(args)?),
            (Some("crews" | "crew"), Some("list" | "ls")) => Command::ListCrews,
            (Some("crews" | "crew"), Some("create")) => Command::CreateCrew(crew_from_args(args)?),
            (Some("kickoff"), _) => {
                let crew_ids: Vec<String> = positional[1..].to_vec();
                if crew_ids.is_empty() {
                    return Err(anyhow!("kickoff requires at least one <crew_id>"));
                }
                Command::Kickoff {
                    crew_ids,
                    inputs: parse_string_flag(args, "--inputs").unwrap_or_default(),
                }
            }
            (Some("status"), _) => {
                let execution_id = positional
                    .get(1)
                    .cloned()
                    .ok_or_else(|| anyhow!("status requires <execution_id>"))?;
                Command::Status { execution_id }
            }
            (Some(group @ ("agents" | "agent" | "tasks" | "task" | "crews" | "crew")), action) => {
                return Err(anyhow!(
                    "Unsupported {} action '{}'",
                    group,
                    action.unwrap_or("")
                ));
            }
            (Some(other), _) => return Err(anyhow!("Unknown command '{}'", other)),
        }
    };

    Ok(Invocation {
        api_url: parse_string_flag(args, "--api-url"),
        config: parse_string_flag(args, "--config").map(PathBuf::from),
        verbosity: verbosity(args),
        command,
    })
}

fn agent_from_args(args: &[String]) -> Result<AgentSpec> {
    let mut agent = AgentSpec::new(
        &parse_string_flag(args, "--role").unwrap_or_default(),
        &parse_string_flag(args, "--goal").unwrap_or_default(),
        &parse_string_flag(args, "--backstory").unwrap_or_default(),
    );
    agent.llm = parse_string_flag(args, "--llm");
    agent.tools = parse_list_flag(args, "--tools");
    agent.allow_delegation = !has_flag(args, "--no-delegation");
    agent.verbose = has_flag(args, "--verbose-agent");
    agent.validate()?;
    Ok(agent)
}

fn task_from_args(args: &[String]) -> Result<TaskSpec> {
    let task = TaskSpec::new(
        &parse_string_flag(args, "--description").unwrap_or_default(),
        &parse_string_flag(args, "--expected-output").unwrap_or_default(),
        &parse_string_flag(args, "--agent").unwrap_or_default(),
    );
    task.validate()?;
    Ok(task)
}

fn crew_from_args(args: &[String]) -> Result<CrewSpec> {
    let mut crew = CrewSpec::new(
        parse_list_flag(args, "--agents"),
        parse_list_flag(args, "--tasks"),
    );
    if let Some(process) = parse_string_flag(args, "--process") {
        crew.process = process.parse::<CrewProcess>()?;
    }
    crew.manager_llm = parse_string_flag(args, "--manager-llm");
    crew.validate()?;
    Ok(crew)
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let invocation = parse_invocation(&args)?;
    logging::init(invocation.verbosity);

    if invocation.command == Command::Help {
        print_help();
        return Ok(());
    }

    let mut config = CrewdeckConfig::load(invocation.config.as_deref()).await?;
    if let Some(api_url) = &invocation.api_url {
        config = config.with_api_url(api_url)?;
    }
    let store: Arc<dyn EntityStore> = Arc::new(HttpEntityStore::new(
        &config.api_url,
        config.request_timeout(),
    )?);

    match invocation.command {
        Command::Help => Ok(()),
        Command::Ping => entities::ping(store.as_ref(), &config.api_url).await,
        Command::ListAgents => entities::list_agents(store.as_ref()).await,
        Command::CreateAgent(agent) => entities::create_agent(store.as_ref(), &agent).await,
        Command::ListTasks => entities::list_tasks(store.as_ref()).await,
        Command::CreateTask(task) => entities::create_task(store.as_ref(), &task).await,
        Command::ListCrews => entities::list_crews(store.as_ref()).await,
        Command::CreateCrew(crew) => entities::create_crew(store.as_ref(), &crew).await,
        Command::Kickoff { crew_ids, inputs } => {
            kickoff::run_kickoff(store, config.watcher_settings(), &crew_ids, &inputs).await
        }
        Command::Status { execution_id } => kickoff::show_status(store.as_ref(), &execution_id).await,
    }
}
