use std::io::{self, BufRead, Write};

use serde::Serialize;

pub fn output_data<T: Serialize>(data: &T, format: &str) -> anyhow::Result<()> {
    match format {
        "yaml" => {
            println!("{}", serde_yaml::to_string(data)?);
        }
        "json" => {
            println!("{}", serde_json::to_string(data)?);
        }
        _ => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
    }
    Ok(())
}

pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

pub fn print_error(message: &str) {
    eprintln!("\x1b[31m❌ Error: {}\x1b[0m", message);
}

pub fn print_warning(message: &str) {
    println!("\x1b[33m⚠️  Warning: {}\x1b[0m", message);
}

pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}

pub fn confirm_action(message: &str) -> io::Result<bool> {
    println!("⚠️  {}", message);
    let answer = prompt_line("Continue? [y/N]: ")?.unwrap_or_default();
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

/// Asks for a value until a non-blank answer is given. `None` when stdin
/// is closed.
pub fn prompt_field(label: &str) -> io::Result<Option<String>> {
    loop {
        match prompt_line(&format!("{}: ", label))? {
            None => return Ok(None),
            Some(answer) if !answer.is_empty() => return Ok(Some(answer)),
            Some(_) => print_warning(&format!("{} cannot be empty", label)),
        }
    }
}

/// Asks for an optional value; a blank answer is an empty string.
pub fn prompt_optional(label: &str) -> io::Result<String> {
    Ok(prompt_line(&format!("{} (optional): ", label))?.unwrap_or_default())
}

fn prompt_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}
