//! `buildkit descriptor` commands

use anyhow::Result;

use super::GlobalOptions;
use crate::cli::DescriptorCommand;
use buildkit::descriptor::{python_repr, update_descriptor_attribute};
use buildkit::util::shell::Status;

pub fn execute(cmd: DescriptorCommand, global: &GlobalOptions) -> Result<()> {
    let DescriptorCommand::Set(args) = cmd;

    let path = match args.path {
        Some(path) => path,
        None => global.project()?.descriptor_path(),
    };

    match update_descriptor_attribute(&path, &args.attribute, &args.value, args.output.as_deref())? {
        Some(old) => global.shell.status(
            Status::Updated,
            format!(
                "{} = {} (was {})",
                args.attribute,
                python_repr(&args.value),
                old
            ),
        ),
        None => global.shell.warn(format!(
            "attribute `{}` not found in {}; nothing changed",
            args.attribute,
            path.display()
        )),
    }
    Ok(())
}
