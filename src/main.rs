//! Interactive terminal driver for survival scenario training sessions.

use std::io::{self, Write};

use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use lifeboat::config::ClientConfig;
use lifeboat::models::{ReportSummary, ScenarioMeta};
use lifeboat::runner::SessionRunner;
use lifeboat::scenario::{ScenarioPage, ScenarioSession, SessionSummary};
use lifeboat::sse::Choice;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = ClientConfig::from_env();
    println!("lifeboat - survival scenario training");
    println!("backend: {}\n", config.base_url);

    let report_content = prompt("Report content")?;
    let title = prompt("Scenario title")?;
    let description = prompt("Scenario description")?;
    let start_date = chrono::Utc::now().format("%Y-%m-%d").to_string();

    let report = ReportSummary::from_report_content(&report_content, 35.1796, 129.0756, 1);
    let scenario = ScenarioMeta {
        title,
        description,
        start_date,
    };

    let mut runner = SessionRunner::new(&config, report, scenario);
    match runner.client().health_check().await {
        Ok(true) => {}
        Ok(false) => println!("warning: backend reports unhealthy"),
        Err(e) => println!("warning: backend unreachable ({})", e),
    }
    let mut finished = runner.start().await;

    let summary = loop {
        if let Some(summary) = finished.take() {
            break summary;
        }

        render(runner.session());

        let input = prompt("> ")?;
        let input = input.trim();
        match input {
            "/quit" => return Ok(()),
            "/retry" => finished = runner.retry().await,
            "/back" => render_nav(runner.go_back()),
            "/next" => render_nav(runner.go_forward()),
            "/confirm" => match runner.confirm() {
                Some(summary) => break summary,
                None => println!("cannot confirm while streaming or after an error; /retry first"),
            },
            "" => {}
            _ => {
                if let Ok(number) = input.parse::<usize>() {
                    let chosen = pick_choice(runner.session().current_page(), number);
                    match chosen {
                        Some(choice) if runner.session().is_latest_page() => {
                            finished = runner.choose(choice).await;
                        }
                        Some(_) => println!("history pages are read-only; /next to return"),
                        None => println!("no such choice"),
                    }
                } else if runner.session().is_latest_page() {
                    finished = runner.choose_custom(input).await;
                } else {
                    println!("history pages are read-only; /next to return");
                }
            }
        }
    };

    print_summary(&summary);
    match runner.save(&summary).await {
        Ok(()) => println!("session saved."),
        Err(e) => println!("saving failed: {}", e),
    }
    Ok(())
}

/// Resolve one-based user input to a delivered choice. `0` is rejected
/// rather than aliased onto the first choice.
fn pick_choice(page: &ScenarioPage, number: usize) -> Option<Choice> {
    page.choices.get(number.checked_sub(1)?).cloned()
}

fn prompt(label: &str) -> Result<String> {
    print!("{} ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}

fn render(session: &ScenarioSession) {
    println!(
        "\n--- page {} / {} ---",
        session.current_page_index() + 1,
        session.pages().len()
    );
    if let Some(error) = session.error() {
        println!("stream error: {}", error);
        println!("(/retry to regenerate, /quit to leave)");
        return;
    }

    let page = session.current_page();
    if !page.situation.is_empty() {
        println!("{}\n", page.situation);
    }
    if let Some(selected) = &page.selected_choice {
        println!("chosen: {}", selected.text);
    }
    if let Some(feedback) = &page.feedback {
        if !feedback.comment.is_empty() {
            println!("feedback: {}", feedback.comment);
        }
    }
    for (index, choice) in page.choices.iter().enumerate() {
        println!("  {}. {}", index + 1, choice.text);
    }
    if let Some(rate) = session.survival_rate() {
        println!("survival rate: {}% {}", rate.rate, rate.change);
    }
    println!("(number to choose, free text for a custom action, /back /next /retry /confirm /quit)");
}

fn render_nav(session: &ScenarioSession) {
    let page = session.current_page();
    println!(
        "\n--- page {} / {} ---",
        session.current_page_index() + 1,
        session.pages().len()
    );
    if !page.situation.is_empty() {
        println!("{}", page.situation);
    }
}

fn print_summary(summary: &SessionSummary) {
    println!("\n=== session complete ===");
    for (index, entry) in summary.entries.iter().enumerate() {
        println!("\n[{}] {}", index + 1, entry.situation);
        println!("    chose: {}", entry.choice);
        if !entry.feedback.evaluation.is_empty() {
            println!("    evaluation: {}", entry.feedback.evaluation);
        }
        if !entry.feedback.comment.is_empty() {
            println!("    comment: {}", entry.feedback.comment);
        }
        if !entry.feedback.better_choice.is_empty() {
            println!("    better: {}", entry.feedback.better_choice);
        }
        if !entry.feedback.survival_impact.is_empty() {
            println!("    impact: {}", entry.feedback.survival_impact);
        }
    }
    if let Some(rate) = &summary.survival_rate {
        println!("\nfinal survival rate: {}% {}", rate.rate, rate.change);
    }
}
