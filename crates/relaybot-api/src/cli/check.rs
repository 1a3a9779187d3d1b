//! `relaybot check`: verify the inference backend end to end.

use console::style;

use relaybot_infra::llm::test_inference_connection;

use crate::state::AppState;

pub async fn run_check(state: &AppState) -> anyhow::Result<()> {
    let client = state.orchestrator.client();
    println!(
        "\n  {} {} at {}",
        style("Checking").bold(),
        style(client.model()).cyan(),
        style(&state.config.ollama.base_url).dim()
    );

    match test_inference_connection(client).await {
        Ok(reply) => {
            println!("  {} {} connected", style("ok").green().bold(), client.name());
            println!("  {} {}\n", style("Reply:").bold(), style(reply.trim()).dim());
            Ok(())
        }
        Err(e) => {
            println!("  {} {e}\n", style("failed").red().bold());
            anyhow::bail!("{} is not reachable", client.name())
        }
    }
}
