use gfxbuild::commands::{CommandArgs, GfxBuildArgs, GfxBuildCommand};
use gfxbuild_process_management::logging::Logger;
use gfxbuild_utils::{constants::GFXBUILD_DEBUG, get_env_var, is_truthy};
use log::LevelFilter;

fn main() {
    let mut args = match GfxBuildArgs::try_parse_args() {
        Ok(args) => args,
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    };

    let mut level = args.verbosity.log_level_filter();
    if get_env_var(GFXBUILD_DEBUG).is_ok_and(is_truthy) {
        level = level.max(LevelFilter::Debug);
    }

    Logger::new()
        .filter_level(level)
        .log_out_dir(args.log_out.clone())
        .init();

    log::trace!("Parsed arguments: {args:#?}");

    let code = match args.command {
        Some(CommandArgs::Stamp(mut command)) => command.run(),
        Some(CommandArgs::Completions(mut command)) => command.run(),
        None => args.build.run(),
    };

    std::process::exit(code);
}
