//! UI utilities for the client.

use std::io::Write;

/// Print `text` and redisplay the prompt after it
pub fn print_with_prompt(text: &str, username: &str) {
    print!("{}", text);
    print!("{}> ", username);
    std::io::stdout().flush().ok();
}
