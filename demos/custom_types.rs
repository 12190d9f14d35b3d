//! Custom type example.
//!
//! Registers two custom types, shows how `any` arguments infer them, and how
//! a configured type order changes which one wins.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p command-signature-demos --example custom_types
//! ```

use command_signature_core::{CommandBuilder, CustomType, Dispatcher, Settings};

fn hex_color() -> CustomType {
    CustomType::new(
        "color",
        |token| token.starts_with('#') && token.len() == 7,
        |token| {
            let rgb = u32::from_str_radix(&token[1..], 16).map_err(|e| e.to_string())?;
            Ok(serde_json::json!({
                "r": (rgb >> 16) & 0xff,
                "g": (rgb >> 8) & 0xff,
                "b": rgb & 0xff,
            }))
        },
    )
}

fn tag() -> CustomType {
    CustomType::new(
        "tag",
        |token| token.starts_with('#'),
        |token| Ok(serde_json::Value::String(token[1..].to_lowercase())),
    )
}

fn main() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register_type(hex_color()).unwrap();
    dispatcher.register_type(tag()).unwrap();

    dispatcher
        .register(
            CommandBuilder::new("paint")
                .signature("(color) fill [(color) --stroke]")
                .signature("(any[]) things"),
        )
        .unwrap();

    for input in ["#ff8800", "#00ff00 --stroke=#000000", "#abcdef #Rust 3 yes"] {
        let binding = dispatcher.resolve("paint", input).unwrap();
        println!("paint {input}");
        for (name, value) in binding.iter() {
            println!("  {name} = {value}");
        }
    }

    // Tags first: "#abcdef" is now a tag rather than a color.
    dispatcher.set_settings(Settings::default().with_type_order(["tag", "color"]));
    let binding = dispatcher.resolve("paint", "#abcdef #Rust 3 yes").unwrap();
    println!("paint #abcdef #Rust 3 yes  (types: tag, color)");
    for (name, value) in binding.iter() {
        println!("  {name} = {value}");
    }
}
