use std::io::{ self, Write };
use tokio::io::{ AsyncBufRead, AsyncBufReadExt };

use crate::chat::{ ChatEvent, ChatSession };
use crate::models::chat::{ Message, Role };
use crate::ui::layout::{ footer, navbar };

const PROMPT: &str = "> ";
const LOADING: &str = "...";
const RESET_COMMAND: &str = "/reset";
const QUIT_COMMAND: &str = "/quit";

fn label(role: Role) -> &'static str {
    match role {
        Role::Assistant => "Assistant",
        Role::User => "You",
    }
}

/// Backs over `shown`, blanking each cell so a shorter reply leaves no trace.
fn erase(shown: &str) -> String {
    "\u{8} \u{8}".repeat(shown.chars().count())
}

pub fn render_message<W: Write>(out: &mut W, message: &Message) -> io::Result<()> {
    writeln!(out, "{}: {}", label(message.role), message.content)
}

fn render_all<W: Write>(out: &mut W, session: &ChatSession) -> io::Result<()> {
    for message in session.messages() {
        render_message(out, message)?;
    }
    Ok(())
}

/// Line-oriented chat loop. Reads until end of input or `/quit`.
pub async fn run_chat<R, W>(session: &mut ChatSession, input: R, out: &mut W) -> io::Result<()>
    where R: AsyncBufRead + Unpin, W: Write
{
    navbar(out)?;
    writeln!(out, "Type {} to start over, {} to leave.", RESET_COMMAND, QUIT_COMMAND)?;
    render_all(out, session)?;

    let mut lines = input.lines();
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let text = line.trim();
        match text {
            "" => {
                continue;
            }
            QUIT_COMMAND => {
                break;
            }
            RESET_COMMAND => {
                session.reset();
                render_all(out, session)?;
                continue;
            }
            _ => {}
        }

        write!(out, "{}: ", label(Role::Assistant))?;
        out.flush()?;
        let result = session.send(Message::user(text), |event| {
            let _ = match event {
                ChatEvent::Loading(true) => write!(out, "{}", LOADING),
                ChatEvent::Loading(false) => write!(out, "{}", erase(LOADING)),
                ChatEvent::Delta(text) => write!(out, "{}", text),
            };
            let _ = out.flush();
        }).await;

        match result {
            Ok(_) => writeln!(out)?,
            Err(e) => writeln!(out, "(error: {})", e)?,
        }
    }

    footer(out)
}
