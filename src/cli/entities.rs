use anyhow::Result;
use console::style;

use crate::core::api::{AgentSpec, CrewSpec, EntityStore, TaskSpec, short_id};
use crate::core::terminal::{GuideSection, print_info, print_status, print_success};

pub async fn ping(store: &dyn EntityStore, api_url: &str) -> Result<()> {
    let welcome = store.ping().await?;
    print_success(&format!("Backend reachable at {}", api_url));
    print_status("Message", &welcome.message);
    Ok(())
}

pub async fn list_agents(store: &dyn EntityStore) -> Result<()> {
    let agents = store.list_agents().await?;
    if agents.is_empty() {
        print_info("No agents found.");
        return Ok(());
    }
    let mut section = GuideSection::new("Agents");
    for agent in &agents {
        section = section.command(&agent.role, &agent.goal);
    }
    section.print();
    println!();
    Ok(())
}

pub async fn create_agent(store: &dyn EntityStore, agent: &AgentSpec) -> Result<()> {
    let created = store.create_agent(agent).await?;
    print_success(
        created
            .message
            .as_deref()
            .unwrap_or("Agent created successfully."),
    );
    print_status("Role", &created.role);
    Ok(())
}

pub async fn list_tasks(store: &dyn EntityStore) -> Result<()> {
    let tasks = store.list_tasks().await?;
    if tasks.is_empty() {
        print_info("No tasks found.");
        return Ok(());
    }
    let mut section = GuideSection::new("Tasks");
    for task in &tasks {
        section = section.command(
            &task.description,
            &format!("{} (agent: {})", task.expected_output, task.agent),
        );
    }
    section.print();
    println!();
    Ok(())
}

pub async fn create_task(store: &dyn EntityStore, task: &TaskSpec) -> Result<()> {
    let created = store.create_task(task).await?;
    print_success(
        created
            .message
            .as_deref()
            .unwrap_or("Task created successfully."),
    );
    print_status("Description", &created.description);
    Ok(())
}

pub async fn list_crews(store: &dyn EntityStore) -> Result<()> {
    let crews = store.list_crews().await?;
    if crews.is_empty() {
        print_info("No crews found.");
        return Ok(());
    }
    for (crew_id, crew) in &crews {
        println!(
            "\n {} {} ({})",
            style("Crew").bold(),
            style(short_id(crew_id)).cyan().bold(),
            crew_id
        );
        print_status("Agents", &crew.agents.join(", "));
        print_status("Tasks", &crew.tasks.join(", "));
        print_status("Process", crew.process.as_str());
        if let Some(manager) = &crew.manager_llm {
            print_status("Manager LLM", manager);
        }
    }
    println!();
    Ok(())
}

pub async fn create_crew(store: &dyn EntityStore, crew: &CrewSpec) -> Result<()> {
    let created = store.create_crew(crew).await?;
    print_success(
        created
            .message
            .as_deref()
            .unwrap_or("Crew created successfully."),
    );
    print_status("Crew ID", &created.crew_id);
    Ok(())
}
