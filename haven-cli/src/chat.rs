//! Interactive persona chat.

use std::io::Write;

use haven_core::{DiaryStore, Persona};
use haven_gateway::{IllustrationOutcome, Services, save_entry};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::CliError;

/// One line of REPL input
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Message(&'a str),
    SwitchPersona(Result<Persona, String>),
    SaveDiary,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line);
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((command, ""));

    match name {
        "persona" => Input::SwitchPersona(arg.parse()),
        "diary" => Input::SaveDiary,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /persona <name>  switch persona (clears this chat)");
    println!("  /diary           turn this chat into a diary entry");
    println!("  /quit            leave");
    println!("Personas: senior, mentor, friend");
}

fn prompt() -> std::io::Result<()> {
    print!("you> ");
    std::io::stdout().flush()
}

pub async fn run(
    services: &Services,
    store: &dyn DiaryStore,
    persona: Persona,
) -> Result<(), CliError> {
    let conversations = &services.conversations;
    let mut handle = conversations.open(persona);
    println!(
        "Chatting with {}. Type /help for commands.",
        persona.display_name()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            Input::Message("") => continue,
            Input::Message(text) => match conversations.send(handle, text).await {
                Ok(reply) => {
                    let persona = conversations.persona(handle)?;
                    println!("{}> {}", persona.display_name(), reply);
                }
                Err(e) => {
                    tracing::debug!(error = %e, "send failed");
                    eprintln!("{}", e.user_notice());
                }
            },
            Input::SwitchPersona(Ok(next)) => {
                handle = conversations.switch_persona(handle, next)?;
                println!("Now chatting with {}.", next.display_name());
            }
            Input::SwitchPersona(Err(reason)) => eprintln!("{reason}"),
            Input::SaveDiary => match services
                .diaries
                .synthesize_conversation(conversations, handle)
                .await
            {
                Ok((synthesis, fresh)) => {
                    handle = fresh;
                    let summary = synthesis.entry.summary().to_string();
                    save_entry(store, synthesis.entry)?;
                    println!("Diary saved:\n{summary}");
                    if let IllustrationOutcome::Failed(_) = synthesis.illustration {
                        println!("(The illustration couldn't be drawn this time.)");
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "diary synthesis failed");
                    eprintln!("{}", e.user_notice());
                }
            },
            Input::Help => print_help(),
            Input::Quit => break,
            Input::Unknown(command) => eprintln!("Unknown command: {command}. Try /help."),
        }
    }

    let _ = conversations.close(handle);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(parse_input("  hello there "), Input::Message("hello there"));
        assert_eq!(parse_input(""), Input::Message(""));
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            parse_input("/persona mentor"),
            Input::SwitchPersona(Ok(Persona::Mentor))
        );
        assert!(matches!(
            parse_input("/persona pirate"),
            Input::SwitchPersona(Err(_))
        ));
        assert_eq!(parse_input("/diary"), Input::SaveDiary);
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input("/dance"), Input::Unknown("/dance"));
    }
}
