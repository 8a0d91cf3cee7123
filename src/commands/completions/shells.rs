use clap::ValueEnum;
use clap_complete::{Generator, Shell as CompletionShell};
use clap_complete_nushell::Nushell;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash)]
pub enum Shells {
    /// Bourne Again `SHell` (bash)
    Bash,
    /// Elvish shell
    Elvish,
    /// Friendly Interactive `SHell` (fish)
    Fish,
    /// `PowerShell`
    PowerShell,
    /// Z `SHell` (zsh)
    Zsh,
    /// Nushell (nu)
    Nushell,
}

impl Shells {
    const fn clap_shell(self) -> Option<CompletionShell> {
        Some(match self {
            Self::Bash => CompletionShell::Bash,
            Self::Elvish => CompletionShell::Elvish,
            Self::Fish => CompletionShell::Fish,
            Self::PowerShell => CompletionShell::PowerShell,
            Self::Zsh => CompletionShell::Zsh,
            Self::Nushell => return None,
        })
    }
}

impl Generator for Shells {
    fn file_name(&self, name: &str) -> String {
        self.clap_shell()
            .map_or_else(|| Nushell.file_name(name), |shell| shell.file_name(name))
    }

    fn generate(&self, cmd: &clap::Command, buf: &mut dyn std::io::Write) {
        match self.clap_shell() {
            Some(shell) => shell.generate(cmd, buf),
            None => Nushell.generate(cmd, buf),
        }
    }
}

impl std::fmt::Display for Shells {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}
