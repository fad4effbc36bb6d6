use super::RenderSink;
use crate::citation::CitedContent;
use crate::error::ChatError;
use crate::models::chat::{ Annotation, ChatMessage, Role };
use log::error;
use std::collections::HashMap;
use std::io::{ self, Write };
use std::sync::Mutex;

struct TerminalState<W> {
    out: W,
    /// Text already written for each live message.
    printed: HashMap<String, String>,
}

/// Renders the conversation as a scrolling transcript.
///
/// Streaming content is written as it grows; once a message is final its
/// citations are substituted and listed below it.
pub struct TerminalSink<W: Write + Send = io::Stdout> {
    state: Mutex<TerminalState<W>>,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            state: Mutex::new(TerminalState {
                out,
                printed: HashMap::new(),
            }),
        }
    }

    pub fn into_inner(self) -> W {
        match self.state.into_inner() {
            Ok(state) => state.out,
            Err(poisoned) => poisoned.into_inner().out,
        }
    }

    fn with_state<F>(&self, f: F) where F: FnOnce(&mut TerminalState<W>) -> io::Result<()> {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let written = f(&mut *state).and_then(|_| state.out.flush());
        if let Err(e) = written {
            error!("Failed to write to terminal: {}", e);
        }
    }
}

fn label(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "assistant",
    }
}

fn write_citations<W: Write>(out: &mut W, cited: &CitedContent) -> io::Result<()> {
    for (n, name) in cited.references().iter().enumerate() {
        writeln!(out, "    [{}] {}", n + 1, name)?;
    }
    Ok(())
}

impl<W: Write + Send> RenderSink for TerminalSink<W> {
    fn on_message_appended(&self, message: &ChatMessage) {
        self.with_state(|state| {
            if message.is_streaming {
                write!(state.out, "{}> ", label(message.role))?;
                state.printed.insert(message.id.clone(), String::new());
                return Ok(());
            }
            let cited = CitedContent::resolve(message.content.as_str(), &message.annotations);
            writeln!(state.out, "{}> {}", label(message.role), cited.render_plain())?;
            write_citations(&mut state.out, &cited)
        });
    }

    fn on_content_updated(
        &self,
        message_id: &str,
        content: &str,
        is_streaming: bool,
        annotations: &[Annotation]
    ) {
        self.with_state(|state| {
            let TerminalState { out, printed } = state;
            let shown = printed.entry(message_id.to_string()).or_default();

            if is_streaming {
                match content.strip_prefix(shown.as_str()) {
                    Some(rest) => write!(out, "{}", rest)?,
                    None => write!(out, "\nassistant> {}", content)?,
                }
                *shown = content.to_string();
                return Ok(());
            }

            let cited = CitedContent::resolve(content, annotations);
            let rendered = cited.render_plain();
            match rendered.strip_prefix(shown.as_str()) {
                Some(rest) => writeln!(out, "{}", rest)?,
                None => writeln!(out, "\nassistant> {}", rendered)?,
            }
            write_citations(out, &cited)?;
            printed.remove(message_id);
            Ok(())
        });
    }

    fn on_send_failed(&self, _message_id: &str, error: &ChatError) {
        self.with_state(|state| writeln!(state.out, "!! {}", error));
    }

    fn on_conversation_cleared(&self) {
        self.with_state(|state| {
            state.printed.clear();
            writeln!(state.out, "--- new conversation ---")
        });
    }
}
