use clap::{Args, CommandFactory};
use clap_complete::generate;
use log::debug;
use miette::Result;

use crate::{commands::GfxBuildArgs, dispatch::ExitOutcome};

use super::GfxBuildCommand;

mod shells;

pub use shells::Shells;

#[derive(Debug, Clone, Args)]
pub struct CompletionsCommand {
    #[arg(value_enum)]
    shell: Shells,
}

impl GfxBuildCommand for CompletionsCommand {
    fn try_run(&mut self) -> Result<ExitOutcome> {
        debug!("Generating completions for {shell}", shell = self.shell);

        generate(
            self.shell,
            &mut GfxBuildArgs::command(),
            "gfxbuild",
            &mut std::io::stdout().lock(),
        );

        Ok(ExitOutcome::Success)
    }
}

#[cfg(test)]
mod test {
    use clap::ValueEnum;

    use super::*;

    #[test]
    fn every_shell_generates() {
        for shell in Shells::value_variants() {
            let mut buf = Vec::new();
            generate(*shell, &mut GfxBuildArgs::command(), "gfxbuild", &mut buf);

            let script = String::from_utf8(buf).unwrap();
            assert!(script.contains("gfxbuild"), "{shell} completions");
        }
    }
}
