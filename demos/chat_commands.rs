//! Chat bot command dispatch example.
//!
//! Registers a few overloaded commands with aliases, validators, and a
//! fallback handler, then dispatches a handful of input lines against them.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p command-signature-demos --example chat_commands
//! ```

use command_signature_core::{CommandBuilder, DispatchError, Dispatcher, FallbackMode, Settings};

fn main() {
    let mut dispatcher = Dispatcher::new().with_settings(
        Settings::default()
            .with_fallback(FallbackMode::Handle)
            .with_handler(|err: &DispatchError| println!("  ! {err}")),
    );

    dispatcher
        .register(
            CommandBuilder::new("roll")
                .signature("(int) count (int) sides [(int) --bonus]")
                .signature("(int) sides")
                .alias("bonus", "b")
                .description("sides", "Faces on each die")
                .validator("sides", |value| match value.as_int() {
                    Some(sides) if sides >= 2 => Ok(true),
                    _ => Err("a die needs at least two sides".to_string()),
                }),
        )
        .unwrap();

    dispatcher
        .register(
            CommandBuilder::new("kick")
                .signature("(str) user [(str[]) reason] [--silent / --ban]")
                .settings(Settings::default().with_fallback(FallbackMode::Raise)),
        )
        .unwrap();

    let lines = [
        ("roll", "2 6"),
        ("roll", "20"),
        ("roll", "3 8 --b=2"),
        ("roll", "1"),
        ("roll", "lots"),
        ("kick", "mallory spamming links --ban"),
        ("kick", "--silent --ban eve"),
        ("kick", ""),
    ];

    for (command, input) in lines {
        println!("{command} {input}");
        match dispatcher.dispatch(command, input) {
            Ok(Some(binding)) => {
                println!("  matched: {}", binding.signature_source());
                for (name, value) in binding.iter() {
                    println!("    {name} = {value} ({})", value.type_name());
                }
            }
            Ok(None) => println!("  (no result)"),
            Err(err) => println!("  error: {err}"),
        }
    }

    println!();
    println!("Arguments of roll:");
    if let Some(roll) = dispatcher.command("roll") {
        for spec in roll.signatures()[0].arguments() {
            println!("  {:<16} {}", spec.usage(), roll.description(&spec.name));
        }
    }
}
