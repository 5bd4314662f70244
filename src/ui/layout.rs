use std::io::{ self, Write };

pub const APP_TITLE: &str = "Chatbot UI";
const RULE_WIDTH: usize = 60;

pub fn navbar<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "{}", APP_TITLE)?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))
}

pub fn footer<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    writeln!(out, "{} {}", APP_TITLE, env!("CARGO_PKG_VERSION"))
}
