//! Interactive console for calling server functions.
//!
//! Reads commands line by line, prompts for each parameter of the chosen
//! function, sends the call over one persistent connection and prints the
//! result or the server's error.

mod catalog;
mod input;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::debug;

use crate::functions::MethodSpec;
use crate::rpc::{CallOutcome, RpcClient};

pub use catalog::Catalog;
pub use input::{Command, parse_command};

const PROMPT: &str = "\nfunction ('help' to list, 'exit' to quit): ";

/// How a console session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The user typed `exit`
    UserExit,
    /// Input reached EOF
    InputClosed,
    /// The connection to the server was lost
    Disconnected,
}

/// What happened while collecting parameters.
enum Collected {
    Params(Vec<Value>),
    InputClosed,
}

pub struct Console<R, W> {
    input: Lines<R>,
    output: W,
    catalog: Catalog,
    client: RpcClient,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(client: RpcClient, catalog: Catalog, input: R, output: W) -> Self {
        Self {
            input: input.lines(),
            output,
            catalog,
            client,
        }
    }

    /// Run the read-eval-print loop until exit, end of input, or disconnect.
    /// The connection is closed before this returns.
    pub async fn run(mut self) -> Result<ConsoleExit> {
        let help = self.catalog.help();
        self.say(&help).await?;

        let exit = self.repl().await?;

        if exit != ConsoleExit::Disconnected {
            if let Err(e) = self.client.close().await {
                debug!(error = %e, "Error while closing connection");
            }
        }
        self.output.flush().await?;
        Ok(exit)
    }

    async fn repl(&mut self) -> Result<ConsoleExit> {
        loop {
            self.say(PROMPT).await?;
            let Some(line) = self.read_line().await? else {
                return Ok(ConsoleExit::InputClosed);
            };

            let method = match parse_command(&line) {
                Command::Empty => continue,
                Command::Exit => return Ok(ConsoleExit::UserExit),
                Command::Help => {
                    let help = self.catalog.help();
                    self.say(&help).await?;
                    continue;
                }
                Command::Call(name) => match self.catalog.get(&name).cloned() {
                    Some(spec) => spec,
                    None => {
                        self.say(&format!("error: unknown function '{name}'\n")).await?;
                        continue;
                    }
                },
            };

            let params = match self.collect_params(&method).await? {
                Collected::Params(params) => params,
                Collected::InputClosed => return Ok(ConsoleExit::InputClosed),
            };

            if !self.call(&method.name, params).await? {
                return Ok(ConsoleExit::Disconnected);
            }
        }
    }

    /// Prompt for each parameter in order. A value that does not coerce is
    /// reported and asked for again; earlier values are kept.
    async fn collect_params(&mut self, method: &MethodSpec) -> Result<Collected> {
        let mut params = Vec::with_capacity(method.params.len());

        for param in &method.params {
            loop {
                self.say(&format!("{} ({}): ", param.name, param.ty)).await?;
                let Some(line) = self.read_line().await? else {
                    return Ok(Collected::InputClosed);
                };

                match param.ty.parse(&line) {
                    Ok(value) => {
                        params.push(value);
                        break;
                    }
                    Err(e) => self.say(&format!("error: {e}\n")).await?,
                }
            }
        }

        Ok(Collected::Params(params))
    }

    /// Send one call and render the outcome. Returns false if the connection
    /// is gone.
    async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<bool> {
        let shown: Vec<String> = params.iter().map(Value::to_string).collect();
        let id = self.client.next_id();
        self.say(&format!(
            "\nsending {method}({}) with request id {id}\n",
            shown.join(", ")
        ))
        .await?;

        match self.client.call(method, params).await {
            Ok(CallOutcome::Success {
                result,
                result_type,
            }) => {
                self.say(&format!("result: {} ({result_type})\n", render(&result)))
                    .await?;
                Ok(true)
            }
            Ok(CallOutcome::Failure { message }) => {
                self.say(&format!("error: {message}\n")).await?;
                Ok(true)
            }
            Err(e) => {
                debug!(error = %e, "Call failed");
                self.say(&format!("disconnected from server: {e}\n")).await?;
                Ok(false)
            }
        }
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        self.input
            .next_line()
            .await
            .context("Failed to read console input")
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        self.output
            .write_all(text.as_bytes())
            .await
            .context("Failed to write console output")?;
        self.output.flush().await?;
        Ok(())
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_strings_without_quotes() {
        assert_eq!(render(&json!("olleh")), "olleh");
        assert_eq!(render(&json!(["a", "b"])), r#"["a","b"]"#);
        assert_eq!(render(&json!(true)), "true");
    }
}
