use std::io::{self, BufRead, Write};

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use flowdesk_core::types::{Message, Operator, Sender};
use flowdesk_core::{DeskEvent, FlowdeskError, NotAllowed};
use flowdesk_engine::Reply;

use crate::runtime::Runtime;

const HELP: &str = "\
Type a reply, or:
  /button <id>        press a template button
  /pickup <operator>  pick the session up as an operator
  /say <text>         reply as the operator
  /transfer <queue>   move the session to another queue
  /close              close as the operator
  /status             show the session
  /quit               exit";

/// Chat with a published flow from the terminal.
pub async fn run(runtime: Runtime, customer: &str) -> anyhow::Result<()> {
    let Runtime { desk, directory } = runtime;

    let mut events = desk.subscribe();
    let print_handle = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "Simulator lagged behind events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("Flowdesk v{}", env!("CARGO_PKG_VERSION"));
    println!("Flow: {} ({})", desk.graph().name(), desk.graph().id());
    println!("{}\n", HELP);

    let session = desk.start(customer).await?;
    let sid = session.id.clone();
    let mut operator: Option<Operator> = None;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        // Let the printer catch up before prompting.
        tokio::task::yield_now().await;
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let (command, rest) = match input.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (input, ""),
        };

        let result = match command {
            "/quit" | "/exit" | "/q" => break,
            "/help" => {
                println!("{}", HELP);
                continue;
            }
            "/status" => {
                let session = desk.session(&sid).await?;
                println!("Session: {} [{}]", session.id, session.status);
                if let Some(queue) = &session.queue {
                    println!("Queue: {}", queue);
                }
                if let Some(name) = &session.operator_name {
                    println!("Operator: {}", name);
                }
                let mut vars: Vec<_> = session.variables.iter().collect();
                vars.sort();
                for (key, value) in vars {
                    println!("  {} = {}", key, value);
                }
                continue;
            }
            "/button" => desk.reply(&sid, Reply::button(rest)).await.map(|_| ()),
            "/pickup" => {
                let Some(found) = directory.operators().into_iter().find(|op| op.id == rest) else {
                    println!("Unknown operator: {}", rest);
                    continue;
                };
                let picked = desk.pickup(&sid, &found).await.map(|_| ());
                if picked.is_ok() {
                    operator = Some(found);
                }
                picked
            }
            "/say" | "/transfer" | "/close" => {
                let Some(op) = operator.clone() else {
                    println!("No operator has picked this session up.");
                    continue;
                };
                match command {
                    "/say" => desk.operator_reply(&sid, &op, rest).await.map(|_| ()),
                    "/transfer" => {
                        let moved = desk
                            .transfer(&sid, Some(rest.to_string()), None)
                            .await
                            .map(|_| ());
                        if moved.is_ok() {
                            operator = None;
                        }
                        moved
                    }
                    _ => desk.close(&sid, &op).await.map(|_| ()),
                }
            }
            _ => desk.reply(&sid, Reply::text(input)).await.map(|_| ()),
        };

        match result {
            Ok(()) => {}
            Err(FlowdeskError::NotAllowed(NotAllowed::Closed)) => {
                println!("Conversation is closed.");
                break;
            }
            Err(e) => println!("Error: {}", e),
        }
    }

    desk.shutdown();
    print_handle.abort();
    Ok(())
}

fn print_event(event: &DeskEvent) {
    match event {
        DeskEvent::MessageAppended { message, .. } => {
            if let Some(line) = render(message) {
                println!("{}", line);
            }
        }
        DeskEvent::StatusChanged { from, to, .. } => {
            println!("   ({} -> {})", from, to);
        }
        DeskEvent::FlowStalled { node_id, .. } => {
            println!("   (flow stopped at {})", node_id);
        }
        _ => {}
    }
}

/// User messages are already on screen; everything else is echoed.
fn render(message: &Message) -> Option<String> {
    let prefix = match message.sender {
        Sender::User => return None,
        Sender::Bot => "bot",
        Sender::Agent => "agent",
        Sender::System => "system",
    };
    let mut out = format!("{}: {}", prefix, message.text);
    for button in message.buttons.iter().flatten() {
        out.push_str(&format!("\n   [{}] {}", button.id, button.label));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdesk_core::types::{Button, NewMessage};

    #[test]
    fn test_render_skips_user_and_lists_buttons() {
        let user = NewMessage::user("oi").stamp(Default::default());
        assert!(render(&user).is_none());

        let buttons = vec![Button::new("1", "Sim"), Button::new("2", "Não")];
        let bot = NewMessage::bot_with_buttons("Confirma?", buttons).stamp(Default::default());
        assert_eq!(
            render(&bot).unwrap(),
            "bot: Confirma?\n   [1] Sim\n   [2] Não"
        );
    }

    #[test]
    fn test_render_operator_and_system() {
        let agent = NewMessage::agent("Posso ajudar?").stamp(Default::default());
        assert_eq!(render(&agent).unwrap(), "agent: Posso ajudar?");
        let system = NewMessage::system("Conversation closed.").stamp(Default::default());
        assert_eq!(render(&system).unwrap(), "system: Conversation closed.");
    }
}
