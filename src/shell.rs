//! Shell command layer over a mounted volume
//!
//! Pure dispatch: one command line in, printable output out. Terminal,
//! keyboard and prompt handling live with the embedding kernel. Storage
//! errors never escape; every failure becomes one diagnostic line naming
//! the operation and its target.

use alloc::string::String;
use core::fmt::Write;
use log::error;

use crate::filesys::fat32::Fat32;

/// Command interpreter bound to one mounted volume.
pub struct Shell<'a> {
    fs: Fat32<'a>,
}

/// A command line split at its `>` / `>>` redirection, if any.
struct Redirection<'s> {
    command: &'s str,
    target: Option<&'s str>,
    append: bool,
}

/// `>>` wins over `>`; both the command and the target are trimmed.
fn parse_redirection(line: &str) -> Redirection<'_> {
    if let Some((command, target)) = line.split_once(">>") {
        return Redirection {
            command: command.trim(),
            target: Some(target.trim()),
            append: true,
        };
    }
    if let Some((command, target)) = line.split_once('>') {
        return Redirection {
            command: command.trim(),
            target: Some(target.trim()),
            append: false,
        };
    }
    Redirection {
        command: line.trim(),
        target: None,
        append: false,
    }
}

impl<'a> Shell<'a> {
    pub fn new(fs: Fat32<'a>) -> Self {
        Shell { fs }
    }

    /// The mounted volume, for embedders that drive it directly.
    pub fn filesystem(&mut self) -> &mut Fat32<'a> {
        &mut self.fs
    }

    /// Executes one command line and returns its printable output.
    pub fn execute(&mut self, line: &str) -> String {
        let mut out = String::new();
        let parsed = parse_redirection(line);
        let cmd = parsed.command;

        if cmd.is_empty() {
        } else if cmd == "ls" {
            self.cmd_ls(&mut out);
        } else if cmd == "pwd" {
            let _ = writeln!(out, "{}", self.fs.current_path());
        } else if cmd == "help" {
            Self::cmd_help(&mut out);
        } else if let Some(text) = cmd.strip_prefix("echo ") {
            self.cmd_echo(&mut out, text, parsed.target, parsed.append);
        } else if let Some(name) = cmd.strip_prefix("touch ") {
            self.cmd_touch(&mut out, name.trim());
        } else if let Some(name) = cmd.strip_prefix("mkdir ") {
            self.cmd_mkdir(&mut out, name.trim());
        } else if let Some(name) = cmd.strip_prefix("cat ") {
            self.cmd_cat(&mut out, name.trim());
        } else if let Some(name) = cmd.strip_prefix("cd ") {
            self.cmd_cd(&mut out, name.trim());
        } else if cmd == "cd" {
            self.cmd_cd(&mut out, "/");
        } else {
            let _ = writeln!(out, "Unknown command: {}", cmd);
            let _ = writeln!(out, "Type 'help' for available commands");
        }

        out
    }

    fn cmd_ls(&mut self, out: &mut String) {
        match self.fs.list() {
            Ok(entries) => {
                let _ = writeln!(out, "Directory contents:");
                for info in entries {
                    if info.is_dir {
                        let _ = writeln!(out, "  [DIR]  {}", info.name);
                    } else {
                        let _ = writeln!(out, "  {} ({} bytes)", info.name, info.size);
                    }
                }
            }
            Err(err) => {
                error!("shell: ls failed: {}", err);
                let _ = writeln!(out, "Failed to list directory");
            }
        }
    }

    fn cmd_cat(&mut self, out: &mut String, name: &str) {
        if name.is_empty() {
            let _ = writeln!(out, "Usage: cat <file>");
            return;
        }
        match self.fs.read_file(name) {
            Ok(data) => out.push_str(&String::from_utf8_lossy(&data)),
            Err(err) => {
                let _ = writeln!(out, "cat: cannot open '{}': {}", name, err);
            }
        }
    }

    fn cmd_echo(&mut self, out: &mut String, text: &str, target: Option<&str>, append: bool) {
        let Some(target) = target else {
            let _ = writeln!(out, "{}", text);
            return;
        };
        if target.is_empty() {
            let _ = writeln!(out, "Error: No output file specified");
            return;
        }

        let mut data = String::from(text);
        data.push('\n');
        if let Err(err) = self.fs.write_file(target, data.as_bytes(), append) {
            error!("shell: echo to '{}' failed: {}", target, err);
            let _ = writeln!(out, "Failed to write file: {}", target);
        }
    }

    fn cmd_touch(&mut self, out: &mut String, name: &str) {
        match self.fs.create_file(name) {
            Ok(()) => {
                let _ = writeln!(out, "Created: {}", name);
            }
            Err(err) => {
                error!("shell: touch '{}' failed: {}", name, err);
                let _ = writeln!(out, "Failed to create: {}", name);
            }
        }
    }

    fn cmd_mkdir(&mut self, out: &mut String, name: &str) {
        match self.fs.create_directory(name) {
            Ok(()) => {
                let _ = writeln!(out, "Created directory: {}", name);
            }
            Err(err) => {
                error!("shell: mkdir '{}' failed: {}", name, err);
                let _ = writeln!(out, "Failed to create directory: {}", name);
            }
        }
    }

    fn cmd_cd(&mut self, out: &mut String, name: &str) {
        if let Err(err) = self.fs.change_directory(name) {
            error!("shell: cd '{}' failed: {}", name, err);
            let _ = writeln!(out, "cd: cannot enter '{}': {}", name, err);
        }
    }

    fn cmd_help(out: &mut String) {
        let _ = writeln!(out, "Available commands:");
        let _ = writeln!(out, "  ls               - List files");
        let _ = writeln!(out, "  cat <file>       - Display file contents");
        let _ = writeln!(out, "  echo <text>      - Print text or write to file");
        let _ = writeln!(out, "  touch <file>     - Create empty file");
        let _ = writeln!(out, "  mkdir <dir>      - Create directory");
        let _ = writeln!(out, "  cd <dir>         - Change directory");
        let _ = writeln!(out, "  pwd              - Print working directory");
        let _ = writeln!(out, "  help             - Show this help");
    }
}
