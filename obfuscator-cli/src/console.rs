use std::io::{self, BufRead, Write};

use obfuscator_core::flags::{describe, SurfaceFlag};
use obfuscator_core::{
    Candidate, InvalidSelection, ObfuscatorError, Result, SelectionPolicy, TextureChoice,
};

/// Numbered menus on `output`, answers read line by line from `input`.
pub struct ConsolePolicy<R, W> {
    input: R,
    output: W,
}

impl ConsolePolicy<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePolicy<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Keeps asking until a line parses as a number. Range checks are the
    /// caller's job.
    fn read_number(&mut self, prompt: &str) -> Result<usize> {
        loop {
            write!(self.output, "{prompt}")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(ObfuscatorError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed before a texture was chosen",
                )));
            }
            match line.trim().parse::<usize>() {
                Ok(n) => return Ok(n),
                Err(_) => writeln!(self.output, "Please enter a number.")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> SelectionPolicy for ConsolePolicy<R, W> {
    fn choose_representative(
        &mut self,
        label: &[SurfaceFlag],
        flags: i32,
        candidates: &[Candidate],
    ) -> Result<usize> {
        writeln!(self.output)?;
        writeln!(self.output, "Surfaces with flags {flags:#x} ({}):", describe(label))?;
        for candidate in candidates {
            writeln!(self.output, "  [{}] {}", candidate.display_index, candidate.name)?;
        }
        self.read_number("Texture to use for this group: ")
    }

    fn choose_texture(&mut self, candidates: &[TextureChoice]) -> Result<u32> {
        writeln!(self.output)?;
        writeln!(self.output, "Textures in this map:")?;
        for choice in candidates {
            writeln!(self.output, "  [{}] {}", choice.id, choice.name)?;
        }
        let id = self.read_number("Texture to force on every brush side: ")?;
        Ok(u32::try_from(id).unwrap_or(u32::MAX))
    }

    fn rejected(&mut self, err: &InvalidSelection) {
        if let Err(write_err) = writeln!(self.output, "Invalid choice: {err}") {
            log::warn!("could not show rejection: {write_err}");
        }
    }
}
