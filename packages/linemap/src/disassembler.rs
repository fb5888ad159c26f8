// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use anyhow::{Context, Result};

pub const DEFAULT_OBJDUMP: &str = "../linux-tools/bin/powerpc-eabi-objdump";
pub const DEFAULT_BINARY: &str = "vmlinux";
/// Disassemble (`-d`) with source line numbers interleaved (`-l`).
pub const DEFAULT_FLAGS: &[&str] = &["-dl"];

/// Anything that can produce the text of an `objdump -dl` run, one line at a
/// time, in output order.
pub trait DisassemblySource {
    fn for_each_line(&mut self, sink: &mut dyn FnMut(&str)) -> Result<()>;
}

/// Runs objdump on a binary and streams its stdout.
pub struct Objdump {
    pub program: PathBuf,
    pub flags: Vec<String>,
    pub binary: PathBuf,
    /// Exit status of the last completed run.
    pub last_status: Option<ExitStatus>,
}

impl Default for Objdump {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_OBJDUMP),
            flags: DEFAULT_FLAGS.iter().map(|f| f.to_string()).collect(),
            binary: PathBuf::from(DEFAULT_BINARY),
            last_status: None,
        }
    }
}

impl Objdump {
    pub fn new(program: impl Into<PathBuf>, binary: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            binary: binary.into(),
            ..Self::default()
        }
    }
}

/// Kills and reaps the child when dropped so objdump never outlives a build,
/// whether or not its output was read to the end.
struct ChildGuard {
    child: Child,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        // Only still running after an early return; kill fails harmlessly
        // once the child has been reaped.
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            match self.child.wait() {
                Ok(status) => log::debug!("objdump stopped: {}", status),
                Err(e) => log::warn!("Failed to reap objdump: {}", e),
            }
        }
    }
}

impl DisassemblySource for Objdump {
    fn for_each_line(&mut self, sink: &mut dyn FnMut(&str)) -> Result<()> {
        log::info!(
            "Running {} {} {}",
            self.program.display(),
            self.flags.join(" "),
            self.binary.display()
        );
        let child = Command::new(&self.program)
            .args(&self.flags)
            .arg(&self.binary)
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start {}", self.program.display()))?;
        let mut guard = ChildGuard { child };

        let stdout = guard
            .child
            .stdout
            .take()
            .context("failed to capture objdump stdout")?;
        let count = pump_lines(BufReader::with_capacity(64 * 1024, stdout), sink)
            .context("reading objdump output")?;
        log::debug!("Read {} lines from objdump", count);

        // Stdout is at EOF; wait for the exit status before the guard kills.
        let status = guard
            .child
            .wait()
            .with_context(|| format!("waiting for {}", self.program.display()))?;
        if !status.success() {
            log::warn!("{} exited with {}", self.program.display(), status);
        }
        self.last_status = Some(status);
        Ok(())
    }
}

/// Replays a saved `objdump -dl` listing instead of running objdump.
pub struct ListingFile {
    pub path: PathBuf,
}

impl ListingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DisassemblySource for ListingFile {
    fn for_each_line(&mut self, sink: &mut dyn FnMut(&str)) -> Result<()> {
        log::info!("Reading listing {}", self.path.display());
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let count = pump_lines(BufReader::with_capacity(64 * 1024, file), sink)
            .with_context(|| format!("reading {}", self.path.display()))?;
        log::debug!("Read {} lines from {}", count, self.path.display());
        Ok(())
    }
}

/// Read `reader` to EOF, handing each line to `sink` without its line
/// terminator. Invalid UTF-8 is replaced rather than rejected. Returns the
/// number of lines read.
pub fn pump_lines<R: BufRead>(mut reader: R, sink: &mut dyn FnMut(&str)) -> std::io::Result<u64> {
    let mut buf: Vec<u8> = Vec::with_capacity(8 * 1024);
    let mut count = 0;
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break; // EOF
        }

        while buf
            .last()
            .map(|b| *b == b'\n' || *b == b'\r')
            .unwrap_or(false)
        {
            buf.pop();
        }

        let line = String::from_utf8_lossy(&buf);
        sink(line.as_ref());
        count += 1;
    }
    Ok(count)
}
