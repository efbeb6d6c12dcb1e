use anyhow::Result;
use conta_core::Navigator;
use std::io::{self, Write};

pub fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

/// Reads the card password from stdin. Nothing is echoed back by us.
pub fn prompt_secret(label: &str) -> Result<String> {
    print!("{} (stdin): ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim_end_matches(['\r', '\n']).to_string())
}

/// Prints screen transitions the way a navigation stack would show them.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn go_back(&self) {
        println!("<- voltar");
    }

    fn set_title(&self, title: &str) {
        println!("\n== {} ==", title);
    }
}
