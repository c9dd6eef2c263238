use crate::agent::ChatAgent;
use crate::models::chat::Role;
use log::{ error, info };
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt };

const GREETING: &str = "How can I assist you today?";
const KEY_PROMPT: &str = "Please enter your API key to continue:";
const HELP: &str =
    "Commands: /open (show or hide the chat), /key <api key>, /history, /help, /quit";

/// Line-oriented chat panel. Plain lines are submitted as messages while
/// the panel is open; lines starting with `/` are commands.
pub async fn run_panel<R, W>(agent: &ChatAgent, input: R, mut output: W) -> std::io::Result<()>
    where R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin
{
    let store = agent.store();
    let mut lines = input.lines();
    let mut awaiting_key = false;

    if store.is_open() {
        greet(agent, &mut output).await?;
    }
    if store.credential().is_none() {
        awaiting_key = true;
        write_line(&mut output, KEY_PROMPT).await?;
    }

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches('\r');
        let trimmed = line.trim();

        if let Some(command) = trimmed.strip_prefix('/') {
            let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
            match name {
                "quit" | "exit" => break,
                "help" => write_line(&mut output, HELP).await?,
                "open" | "close" | "toggle" => {
                    if store.toggle_open() {
                        write_line(&mut output, "Chat opened.").await?;
                        greet(agent, &mut output).await?;
                    } else {
                        write_line(&mut output, "Chat closed.").await?;
                    }
                }
                "key" => {
                    if save_key(agent, rest, &mut output).await? {
                        awaiting_key = false;
                    }
                }
                "history" => {
                    for message in store.messages() {
                        let line = format!(
                            "[{}] {}: {}",
                            message.timestamp.format("%H:%M:%S"),
                            speaker(message.role),
                            message.content
                        );
                        write_line(&mut output, &line).await?;
                    }
                }
                _ => write_line(&mut output, &format!("Unknown command '/{}'. {}", name, HELP)).await?,
            }
            continue;
        }

        if awaiting_key {
            if save_key(agent, trimmed, &mut output).await? {
                awaiting_key = false;
            }
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        if !store.is_open() {
            write_line(&mut output, "Chat is closed. Type /open to start chatting.").await?;
            continue;
        }

        write_line(&mut output, "Thinking...").await?;
        match agent.submit(line).await {
            Ok(reply) => {
                write_line(&mut output, &format!("{}: {}", speaker(reply.role), reply.content)).await?;
            }
            Err(e) => {
                write_line(&mut output, &format!("Error: {}", e)).await?;
                if e.requires_credential() {
                    awaiting_key = true;
                    write_line(&mut output, KEY_PROMPT).await?;
                }
            }
        }
    }

    info!("Chat panel closed");
    output.flush().await
}

async fn greet<W: AsyncWrite + Unpin>(agent: &ChatAgent, output: &mut W) -> std::io::Result<()> {
    if agent.store().messages().is_empty() {
        write_line(output, GREETING).await?;
    }
    Ok(())
}

async fn save_key<W: AsyncWrite + Unpin>(
    agent: &ChatAgent,
    key: &str,
    output: &mut W
) -> std::io::Result<bool> {
    match agent.save_credential(key) {
        Ok(true) => {
            write_line(output, "API key saved successfully").await?;
            Ok(true)
        }
        Ok(false) => {
            write_line(output, KEY_PROMPT).await?;
            Ok(false)
        }
        Err(e) => {
            error!("Failed to persist API key: {}", e);
            // The key is still active for this session.
            write_line(output, &format!("Error: {}", e)).await?;
            Ok(agent.store().credential().is_some())
        }
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
        Role::System => "System",
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> std::io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
