//! Welcome banner for the local chat loop.

use console::style;

/// Print the welcome banner: backend, model, and history settings.
pub fn print_welcome_banner(backend: &str, model: &str, max_messages: usize, policy: &str) {
    println!();
    println!("  * {}", style("relaybot").cyan().bold());
    println!("  {}", style("Local chat session").dim());
    println!();
    println!(
        "  {}    {}",
        style("Model:").bold(),
        style(format!("{model} ({backend})")).dim()
    );
    println!(
        "  {}  {}",
        style("History:").bold(),
        style(format!("{max_messages} messages, {policy} trimming")).dim()
    );
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
    println!();
}
